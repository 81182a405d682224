//! Gateway tests against a real Postgres. They need `DATABASE_URL` and are
//! ignored by default: `cargo test -- --ignored`.

use social_graph::{
    AppError,
    models::{NewGroup, NewPost, NewUser, User, UserChanges},
    repository::{
        GroupMemberRepository, GroupRepository, JoinRequestRepository, LikeRepository,
        PageOptions, PostRepository, PostgresRepository, UserRepository,
    },
};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU32, Ordering};

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

static SEQ: AtomicU32 = AtomicU32::new(0);

/// A user with a tag unique to this test run.
async fn create_test_user(repo: &PostgresRepository) -> User {
    let tag = format!(
        "t{}_{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::SeqCst)
    );
    UserRepository::create(
        repo,
        NewUser {
            email: format!("{tag}@test.com"),
            user_tag: tag,
            password_hash: "not-a-real-hash".to_string(),
            user_name: None,
            biography: None,
        },
    )
    .await
    .expect("Failed to insert test user")
}

fn post_by(author_id: i32, parent_post_id: Option<i32>, group_id: Option<i32>) -> NewPost {
    NewPost {
        content: "integration".to_string(),
        author_id,
        parent_post_id,
        original_post_id: None,
        is_repost: false,
        group_id,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore]
async fn test_duplicate_user_tag_is_bad_request() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let err = UserRepository::create(
        &repo,
        NewUser {
            email: format!("other_{}", user.email),
            user_tag: user.user_tag.clone(),
            password_hash: "x".to_string(),
            user_name: None,
            biography: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "User already exists"));
}

#[tokio::test]
#[ignore]
async fn test_reply_and_like_counters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo).await;
    let fan = create_test_user(&repo).await;

    let root = PostRepository::create(&repo, post_by(author.id, None, None)).await.unwrap();
    let child = PostRepository::create(&repo, post_by(fan.id, Some(root.id), None))
        .await
        .unwrap();
    LikeRepository::create(&repo, fan.id, root.id).await.unwrap();

    let err = LikeRepository::create(&repo, fan.id, root.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let root_now = PostRepository::find_by_id(&repo, root.id).await.unwrap().unwrap();
    assert_eq!(root_now.comments_count, 1);
    assert_eq!(root_now.likes_count, 1);

    assert!(PostRepository::delete(&repo, child.id).await.unwrap());
    assert!(LikeRepository::delete(&repo, fan.id, root.id).await.unwrap());
    let root_now = PostRepository::find_by_id(&repo, root.id).await.unwrap().unwrap();
    assert_eq!(root_now.comments_count, 0);
    assert_eq!(root_now.likes_count, 0);
}

#[tokio::test]
#[ignore]
async fn test_group_lifecycle_is_transactional() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let joiner = create_test_user(&repo).await;

    let group = GroupRepository::create(
        &repo,
        NewGroup {
            name: "integration".to_string(),
            description: None,
            is_private: true,
            creator_id: owner.id,
        },
    )
    .await
    .unwrap();
    assert!(
        GroupMemberRepository::find_by_user_and_group(&repo, owner.id, group.id)
            .await
            .unwrap()
            .is_some()
    );

    // Private and not a member yet.
    let visible = GroupRepository::find_visible(&repo, joiner.id, &PageOptions::for_ids(vec![group.id]))
        .await
        .unwrap();
    assert!(visible.is_empty());

    JoinRequestRepository::create(&repo, joiner.id, group.id).await.unwrap();
    let member = JoinRequestRepository::accept(&repo, joiner.id, group.id, owner.id)
        .await
        .unwrap();
    assert_eq!(member.created_by_id, owner.id);
    assert!(
        JoinRequestRepository::find_by_user_and_group(&repo, joiner.id, group.id)
            .await
            .unwrap()
            .is_none()
    );

    PostRepository::create(&repo, post_by(joiner.id, None, Some(group.id)))
        .await
        .unwrap();

    assert!(GroupRepository::delete(&repo, group.id).await.unwrap());
    assert!(GroupRepository::find_by_id(&repo, group.id).await.unwrap().is_none());
    assert!(
        PostRepository::find_all_of_group(&repo, group.id, &PageOptions::default())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        GroupMemberRepository::find_all(&repo, group.id, &PageOptions::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore]
async fn test_accept_without_request_is_not_found() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;

    let group = GroupRepository::create(
        &repo,
        NewGroup {
            name: "empty".to_string(),
            description: None,
            is_private: false,
            creator_id: owner.id,
        },
    )
    .await
    .unwrap();

    let err = JoinRequestRepository::accept(&repo, owner.id + 100_000, group.id, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_token_version_bump() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    assert!(UserRepository::increment_token_version(&repo, user.id).await.unwrap());
    let reloaded = UserRepository::find_by_id(&repo, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.token_version, user.token_version + 1);

    assert!(UserRepository::delete(&repo, user.id).await.unwrap());
    assert!(UserRepository::find_by_id(&repo, user.id).await.unwrap().is_none());
    assert!(!UserRepository::increment_token_version(&repo, user.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_password_update_bumps_token_version() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let bio_only = UserChanges {
        biography: Some("hello".to_string()),
        ..UserChanges::default()
    };
    let updated = UserRepository::update(&repo, user.id, bio_only).await.unwrap().unwrap();
    assert_eq!(updated.token_version, user.token_version);

    let new_password = UserChanges {
        password_hash: Some("another-hash".to_string()),
        ..UserChanges::default()
    };
    let updated = UserRepository::update(&repo, user.id, new_password)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.password, "another-hash");
    assert_eq!(updated.token_version, user.token_version + 1);
}
