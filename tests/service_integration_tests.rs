mod common;

use common::{register, registration, services};
use social_graph::{
    AppError, Services,
    models::{
        CreateGroupRequest, CreateListRequest, CreatePostRequest, RegisterUserRequest,
        UpdateGroupRequest, UpdateUserRequest, UserView,
    },
    repository::PageOptions,
};
use std::sync::Arc;

fn text(content: &str) -> CreatePostRequest {
    CreatePostRequest {
        content: content.to_string(),
        ..Default::default()
    }
}

fn reply(content: &str, parent_post_id: i32) -> CreatePostRequest {
    CreatePostRequest {
        parent_post_id: Some(parent_post_id),
        ..text(content)
    }
}

fn group(name: &str, is_private: bool) -> CreateGroupRequest {
    CreateGroupRequest {
        name: name.to_string(),
        description: None,
        is_private: Some(is_private),
    }
}

fn list(name: &str, is_private: bool) -> CreateListRequest {
    CreateListRequest {
        name: name.to_string(),
        description: Some("people worth reading".to_string()),
        is_private: Some(is_private),
    }
}

fn page() -> PageOptions {
    PageOptions::default()
}

// --- Registration & profiles ---

#[tokio::test]
async fn test_registration_scenario() {
    let services = services();
    let a = services
        .users
        .create(RegisterUserRequest {
            email: "a@x.com".into(),
            user_tag: "alice1".into(),
            password: "Abcdef1!".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let b = register(&services, "bobby").await;

    services.users.follow(a.id, b.id).await.unwrap();
    let err = services.users.follow(a.id, b.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "You already follow this user"));

    let followers = services.users.find_followers(a.id, &page()).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, b.id);
}

#[tokio::test]
async fn test_registration_rejects_invalid_input() {
    let services = services();
    register(&services, "alice").await;

    let cases = [
        RegisterUserRequest {
            email: "not-an-email".into(),
            ..registration("carol")
        },
        RegisterUserRequest {
            user_tag: "abc".into(),
            ..registration("carol")
        },
        RegisterUserRequest {
            password: "abcdefgh".into(),
            ..registration("carol")
        },
        RegisterUserRequest {
            password: "Abcdefg1".into(),
            ..registration("carol")
        },
        // Taken tag, taken email.
        registration("alice"),
        RegisterUserRequest {
            email: "alice@example.com".into(),
            ..registration("carol")
        },
    ];

    for case in cases {
        let tag = case.user_tag.clone();
        let result = services.users.create(case).await;
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "registration of {tag} should be rejected, got {result:?}"
        );
    }
}

#[tokio::test]
async fn test_profile_view_depends_on_viewer() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    match services.users.find_by_id(alice.id, alice.id).await.unwrap() {
        UserView::Owner(view) => assert_eq!(view.email, "alice@example.com"),
        other => panic!("expected owner view, got {other:?}"),
    }
    assert!(matches!(
        services.users.find_by_id(alice.id, bobby.id).await.unwrap(),
        UserView::Public(_)
    ));
    assert!(matches!(
        services.users.find_by_tag("alice", bobby.id).await.unwrap(),
        UserView::Public(view) if view.id == alice.id
    ));
}

#[tokio::test]
async fn test_only_owner_updates_profile() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    let update = UpdateUserRequest {
        biography: Some("hello".into()),
        ..Default::default()
    };
    assert!(matches!(
        services.users.update(alice.id, update.clone(), bobby.id).await,
        Err(AppError::Forbidden(_))
    ));

    let updated = services
        .users
        .update(alice.id, update, alice.id)
        .await
        .unwrap();
    assert_eq!(updated.biography.as_deref(), Some("hello"));

    // Re-submitting the current tag is not a conflict; taking another user's is.
    let same_tag = UpdateUserRequest {
        user_tag: Some("alice".into()),
        ..Default::default()
    };
    services.users.update(alice.id, same_tag, alice.id).await.unwrap();
    let taken = UpdateUserRequest {
        user_tag: Some("bobby".into()),
        ..Default::default()
    };
    assert!(matches!(
        services.users.update(alice.id, taken, alice.id).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_invalid_ids_are_rejected() {
    let services = services();
    let alice = register(&services, "alice").await;

    assert!(matches!(
        services.users.find_by_id(0, alice.id).await,
        Err(AppError::BadRequest(msg)) if msg == "Invalid ID"
    ));
    assert!(matches!(
        services.posts.find_by_id(-4, alice.id).await,
        Err(AppError::BadRequest(_))
    ));
}

// --- Follows ---

#[tokio::test]
async fn test_follow_rules() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let carol = register(&services, "carol").await;

    assert!(matches!(
        services.users.follow(alice.id, alice.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.users.follow(999, alice.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        services.users.unfollow(bobby.id, alice.id).await,
        Err(AppError::BadRequest(_))
    ));

    services.users.follow(alice.id, bobby.id).await.unwrap();
    services.users.follow(alice.id, carol.id).await.unwrap();
    services.users.follow(carol.id, bobby.id).await.unwrap();

    let following = services.users.find_following(bobby.id, &page()).await.unwrap();
    let ids: Vec<i32> = following.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![carol.id, alice.id]);

    // Only alice may drop her own followers.
    assert!(matches!(
        services.users.remove_follower(alice.id, bobby.id, carol.id).await,
        Err(AppError::Forbidden(_))
    ));
    services
        .users
        .remove_follower(alice.id, bobby.id, alice.id)
        .await
        .unwrap();
    assert!(matches!(
        services.users.remove_follower(alice.id, bobby.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));

    services.users.unfollow(alice.id, carol.id).await.unwrap();
    assert!(services.users.find_followers(alice.id, &page()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_duplicate_follows() {
    let services = Arc::new(services());
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.users.follow(alice.id, bobby.id).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(AppError::BadRequest(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    let followers = services.users.find_followers(alice.id, &page()).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, bobby.id);
}

// --- Posts ---

#[tokio::test]
async fn test_reply_counts_follow_replies() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    let root = services.posts.create(alice.id, text("root")).await.unwrap();
    let first = services.posts.create(bobby.id, reply("first", root.id)).await.unwrap();
    services.posts.create(alice.id, reply("second", root.id)).await.unwrap();

    let root_now = services.posts.find_by_id(root.id, alice.id).await.unwrap();
    assert_eq!(root_now.comments_count, 2);

    let children = services
        .posts
        .find_children_of_post(root.id, alice.id, &page())
        .await
        .unwrap();
    assert_eq!(children.len(), 2);

    let parent = services.posts.find_parent_post(first.id, alice.id).await.unwrap();
    assert_eq!(parent.id, root.id);
    assert!(matches!(
        services.posts.find_parent_post(root.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));

    assert!(matches!(
        services.posts.delete(first.id, alice.id).await,
        Err(AppError::Forbidden(_))
    ));
    services.posts.delete(first.id, bobby.id).await.unwrap();

    let root_now = services.posts.find_by_id(root.id, alice.id).await.unwrap();
    assert_eq!(root_now.comments_count, 1);
    assert!(matches!(
        services.posts.find_by_id(first.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_post_content_is_validated() {
    let services = services();
    let alice = register(&services, "alice").await;

    assert!(matches!(
        services.posts.create(alice.id, text("   ")).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.posts.create(alice.id, text(&"x".repeat(501))).await,
        Err(AppError::BadRequest(_))
    ));
    services
        .posts
        .create(alice.id, text(&"x".repeat(500)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reposts_need_an_original() {
    let services = services();
    let alice = register(&services, "alice").await;
    let original = services.posts.create(alice.id, text("original")).await.unwrap();

    let missing = CreatePostRequest {
        is_repost: Some(true),
        ..text("repost")
    };
    assert!(matches!(
        services.posts.create(alice.id, missing).await,
        Err(AppError::BadRequest(_))
    ));

    let repost = CreatePostRequest {
        original_post_id: Some(original.id),
        ..text("repost")
    };
    let repost = services.posts.create(alice.id, repost).await.unwrap();
    assert!(repost.is_repost);
    assert_eq!(repost.original_post_id, Some(original.id));
}

#[tokio::test]
async fn test_only_author_edits_post() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let post = services.posts.create(alice.id, text("draft")).await.unwrap();

    assert!(matches!(
        services.posts.update(post.id, "hijack".into(), bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    let edited = services
        .posts
        .update(post.id, "final".into(), alice.id)
        .await
        .unwrap();
    assert_eq!(edited.content, "final");
}

#[tokio::test]
async fn test_delete_all_posts_of_user() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    services.posts.create(alice.id, text("one")).await.unwrap();
    services.posts.create(alice.id, text("two")).await.unwrap();
    services.posts.create(bobby.id, text("three")).await.unwrap();

    assert!(matches!(
        services.posts.delete_all_of_user(alice.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    let removed = services
        .posts
        .delete_all_of_user(alice.id, alice.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let timeline = services.posts.find_all(&page()).await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].author_id, bobby.id);
}

#[tokio::test]
async fn test_timeline_paging() {
    let services = services();
    let alice = register(&services, "alice").await;
    for i in 0..30 {
        services
            .posts
            .create(alice.id, text(&format!("post {i}")))
            .await
            .unwrap();
    }

    let first = services.posts.find_all(&page()).await.unwrap();
    assert_eq!(first.len(), 25);
    assert_eq!(first[0].content, "post 29");

    let second = PageOptions {
        page: 2,
        ..page()
    };
    let rest = services.posts.find_all(&second).await.unwrap();
    assert_eq!(rest.len(), 5);
    assert_eq!(rest[4].content, "post 0");

    let huge = PageOptions {
        entries_per_page: Some(1_000),
        ..page()
    };
    assert_eq!(services.posts.find_all(&huge).await.unwrap().len(), 30);
}

// --- Likes & bookmarks ---

#[tokio::test]
async fn test_like_lifecycle() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let post = services.posts.create(alice.id, text("likeable")).await.unwrap();

    services.posts.create_like(post.id, bobby.id).await.unwrap();
    assert!(matches!(
        services.posts.create_like(post.id, bobby.id).await,
        Err(AppError::BadRequest(msg)) if msg == "Like already exists"
    ));
    assert_eq!(
        services.posts.find_by_id(post.id, bobby.id).await.unwrap().likes_count,
        1
    );

    let likers = services
        .posts
        .find_likes_of_post(post.id, alice.id, &page())
        .await
        .unwrap();
    assert_eq!(likers.len(), 1);
    assert_eq!(likers[0].user_tag, "bobby");

    let liked = services
        .posts
        .find_liked_by_user(bobby.id, &page())
        .await
        .unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].id, post.id);

    services.posts.delete_like(post.id, bobby.id).await.unwrap();
    assert!(matches!(
        services.posts.delete_like(post.id, bobby.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(
        services.posts.find_by_id(post.id, bobby.id).await.unwrap().likes_count,
        0
    );
}

#[tokio::test]
async fn test_concurrent_duplicate_likes() {
    let services = Arc::new(services());
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let post = services.posts.create(alice.id, text("race")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.posts.create_like(post.id, bobby.id).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(AppError::BadRequest(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(
        services.posts.find_by_id(post.id, alice.id).await.unwrap().likes_count,
        1
    );
}

#[tokio::test]
async fn test_concurrent_duplicate_bookmarks() {
    let services = Arc::new(services());
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let post = services.posts.create(alice.id, text("race")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services.bookmarks.create(post.id, bobby.id).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::BadRequest(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(
        services
            .bookmarks
            .find_bookmarked_by_user(bobby.id, &page())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_bookmarks_are_private_to_their_owner() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let first = services.posts.create(alice.id, text("first")).await.unwrap();
    let second = services.posts.create(alice.id, text("second")).await.unwrap();

    services.bookmarks.create(first.id, bobby.id).await.unwrap();
    services.bookmarks.create(second.id, bobby.id).await.unwrap();
    assert!(matches!(
        services.bookmarks.create(first.id, bobby.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.bookmarks.create(999, bobby.id).await,
        Err(AppError::NotFound(_))
    ));

    let saved = services
        .bookmarks
        .find_bookmarked_by_user(bobby.id, &page())
        .await
        .unwrap();
    let ids: Vec<i32> = saved.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert!(services
        .bookmarks
        .find_bookmarked_by_user(alice.id, &page())
        .await
        .unwrap()
        .is_empty());

    services.bookmarks.delete(first.id, bobby.id).await.unwrap();
    assert!(matches!(
        services.bookmarks.delete(first.id, bobby.id).await,
        Err(AppError::NotFound(_))
    ));
}

// --- Lists ---

#[tokio::test]
async fn test_private_list_is_hidden() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    let secret = services.lists.create(alice.id, list("secret", true)).await.unwrap();
    let open = services.lists.create(alice.id, list("open", false)).await.unwrap();

    assert!(matches!(
        services.lists.find_by_id(secret.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        services.lists.follow_list(secret.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));

    let visible = services.lists.find_all(bobby.id, &page()).await.unwrap();
    assert_eq!(visible, vec![open.clone()]);
    let own = services.lists.find_all(alice.id, &page()).await.unwrap();
    assert_eq!(own.len(), 2);

    let of_alice = services
        .lists
        .find_lists_of_user(alice.id, bobby.id, &page())
        .await
        .unwrap();
    assert_eq!(of_alice, vec![open]);
}

#[tokio::test]
async fn test_list_membership_and_followers() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let carol = register(&services, "carol").await;
    let reading = services.lists.create(alice.id, list("reading", false)).await.unwrap();

    services.lists.add_member(reading.id, bobby.id, alice.id).await.unwrap();
    assert!(matches!(
        services.lists.add_member(reading.id, bobby.id, alice.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.lists.add_member(reading.id, carol.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));

    let members = services
        .lists
        .find_members(reading.id, carol.id, &page())
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, bobby.id);

    services.lists.follow_list(reading.id, carol.id).await.unwrap();
    assert!(matches!(
        services.lists.follow_list(reading.id, carol.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.lists.unfollow_list(reading.id, carol.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    services
        .lists
        .unfollow_list(reading.id, carol.id, carol.id)
        .await
        .unwrap();
    assert!(services
        .lists
        .find_followers(reading.id, alice.id, &page())
        .await
        .unwrap()
        .is_empty());

    services.lists.remove_member(reading.id, bobby.id, alice.id).await.unwrap();
    assert!(matches!(
        services.lists.remove_member(reading.id, bobby.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_delete_is_creator_only() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;
    let reading = services.lists.create(alice.id, list("reading", false)).await.unwrap();
    services.lists.add_member(reading.id, bobby.id, alice.id).await.unwrap();
    services.lists.follow_list(reading.id, bobby.id).await.unwrap();

    assert!(matches!(
        services.lists.delete(reading.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    services.lists.delete(reading.id, alice.id).await.unwrap();
    assert!(matches!(
        services.lists.find_by_id(reading.id, alice.id).await,
        Err(AppError::NotFound(_))
    ));
}

// --- Groups ---

async fn private_group_with_member(services: &Services) -> (i32, i32, i32) {
    let owner = register(services, "owner").await;
    let member = register(services, "member").await;
    let club = services
        .groups
        .create(owner.id, group("club", true))
        .await
        .unwrap();
    services
        .groups
        .create_join_request(club.id, member.id)
        .await
        .unwrap();
    services
        .groups
        .accept_join_request(club.id, member.id, owner.id)
        .await
        .unwrap();
    (club.id, owner.id, member.id)
}

#[tokio::test]
async fn test_private_group_is_hidden_from_outsiders() {
    let services = services();
    let alice = register(&services, "alice").await;
    let bobby = register(&services, "bobby").await;

    let secret = services.groups.create(alice.id, group("secret", true)).await.unwrap();
    let open = services.groups.create(alice.id, group("open", false)).await.unwrap();

    let visible = services.groups.find_all(bobby.id, &page()).await.unwrap();
    assert_eq!(visible, vec![open]);
    assert!(matches!(
        services.groups.find_by_id(secret.id, bobby.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        services.groups.find_members(secret.id, bobby.id, &page()).await,
        Err(AppError::Forbidden(_))
    ));

    // The creator is a member from the start.
    let members = services
        .groups
        .find_members(secret.id, alice.id, &page())
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, alice.id);
}

#[tokio::test]
async fn test_join_request_lifecycle() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;

    services.groups.find_by_id(club, member).await.unwrap();
    assert!(matches!(
        services.groups.create_join_request(club, member).await,
        Err(AppError::BadRequest(_))
    ));

    let outsider = register(&services, "outsider").await;
    services
        .groups
        .create_join_request(club, outsider.id)
        .await
        .unwrap();
    assert!(matches!(
        services.groups.create_join_request(club, outsider.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        services.groups.find_join_requests(club, member, &page()).await,
        Err(AppError::Forbidden(_))
    ));
    let waiting = services
        .groups
        .find_join_requests(club, owner, &page())
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].id, outsider.id);
    assert_eq!(waiting[0].user_tag, "outsider");
    assert!(matches!(
        services.groups.accept_join_request(club, outsider.id, member).await,
        Err(AppError::Forbidden(_))
    ));

    let pending = services
        .groups
        .find_join_requests_of_user(outsider.id, outsider.id, &page())
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    services
        .groups
        .reject_join_request(club, outsider.id, owner)
        .await
        .unwrap();
    assert!(services
        .groups
        .find_join_requests(club, owner, &page())
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        services.groups.accept_join_request(club, outsider.id, owner).await,
        Err(AppError::NotFound(_))
    ));

    services
        .groups
        .create_join_request(club, outsider.id)
        .await
        .unwrap();
    assert!(matches!(
        services.groups.delete_join_request(club, outsider.id, member).await,
        Err(AppError::Forbidden(_))
    ));
    services
        .groups
        .delete_join_request(club, outsider.id, outsider.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_group_member_removal_rules() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;
    let outsider = register(&services, "outsider").await;

    assert!(matches!(
        services.groups.remove_member(club, member, outsider.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        services.groups.remove_member(club, owner, owner).await,
        Err(AppError::Forbidden(msg)) if msg == "As owner you need to delete the group to leave it"
    ));

    // A member can leave on their own.
    services.groups.remove_member(club, member, member).await.unwrap();
    assert!(matches!(
        services.groups.find_by_id(club, member).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        services.groups.remove_member(club, member, owner).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_group_posts_stay_in_the_group() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;
    let outsider = register(&services, "outsider").await;

    let in_group = CreatePostRequest {
        group_id: Some(club),
        ..text("members only")
    };
    assert!(matches!(
        services.posts.create(outsider.id, in_group.clone()).await,
        Err(AppError::Forbidden(_))
    ));
    let post = services.posts.create(member, in_group).await.unwrap();

    // Replies inherit the group of their parent.
    let answer = services.posts.create(owner, reply("welcome", post.id)).await.unwrap();
    assert_eq!(answer.group_id, Some(club));
    let elsewhere = CreatePostRequest {
        group_id: Some(999),
        ..reply("wrong group", post.id)
    };
    assert!(matches!(
        services.posts.create(owner, elsewhere).await,
        Err(AppError::BadRequest(_))
    ));

    assert!(services.posts.find_all(&page()).await.unwrap().is_empty());
    assert!(services
        .posts
        .find_posts_of_user(member, &page())
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        services.posts.find_by_id(post.id, outsider.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        services.groups.find_posts(club, outsider.id, &page()).await,
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(
        services
            .groups
            .find_posts(club, member, &page())
            .await
            .unwrap()
            .len(),
        2
    );

    assert!(matches!(
        services.groups.delete_all_posts(club, member).await,
        Err(AppError::Forbidden(_))
    ));
    assert_eq!(services.groups.delete_all_posts(club, owner).await.unwrap(), 2);
}

#[tokio::test]
async fn test_group_reply_under_public_post_is_rejected() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;
    let outsider = register(&services, "outsider").await;
    let public = services.posts.create(owner, text("hello world")).await.unwrap();

    let smuggled = CreatePostRequest {
        group_id: Some(club),
        ..reply("members only", public.id)
    };
    assert!(matches!(
        services.posts.create(member, smuggled).await,
        Err(AppError::BadRequest(_))
    ));

    assert!(services
        .posts
        .find_children_of_post(public.id, outsider.id, &page())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        services
            .posts
            .find_by_id(public.id, outsider.id)
            .await
            .unwrap()
            .comments_count,
        0
    );
}

#[tokio::test]
async fn test_private_group_posts_cannot_be_read_through_bookmarks() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;
    let outsider = register(&services, "outsider").await;
    let post = services
        .posts
        .create(
            owner,
            CreatePostRequest {
                group_id: Some(club),
                ..text("members only")
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        services.bookmarks.create(post.id, outsider.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(services
        .bookmarks
        .find_bookmarked_by_user(outsider.id, &page())
        .await
        .unwrap()
        .is_empty());

    services.bookmarks.create(post.id, member).await.unwrap();
    let saved = services
        .bookmarks
        .find_bookmarked_by_user(member, &page())
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);

    // Leaving the group takes the bookmarked post out of reach.
    services.groups.remove_member(club, member, member).await.unwrap();
    assert!(services
        .bookmarks
        .find_bookmarked_by_user(member, &page())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_group_update_and_delete() {
    let services = services();
    let (club, owner, member) = private_group_with_member(&services).await;

    let rename = UpdateGroupRequest {
        name: Some("book club".into()),
        is_private: Some(false),
        ..Default::default()
    };
    assert!(matches!(
        services.groups.update(club, rename.clone(), member).await,
        Err(AppError::Forbidden(_))
    ));
    let renamed = services.groups.update(club, rename, owner).await.unwrap();
    assert_eq!(renamed.name, "book club");
    assert!(!renamed.is_private);

    services
        .posts
        .create(
            member,
            CreatePostRequest {
                group_id: Some(club),
                ..text("bye")
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        services.groups.delete(club, member).await,
        Err(AppError::Forbidden(_))
    ));
    services.groups.delete(club, owner).await.unwrap();
    assert!(matches!(
        services.groups.find_by_id(club, owner).await,
        Err(AppError::NotFound(_))
    ));
    assert!(services
        .groups
        .find_groups_of_user(member, member, &page())
        .await
        .unwrap()
        .is_empty());
}
