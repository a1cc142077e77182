//! Shared test fixtures: throwaway database plus seeding shortcuts

use kwicmark_an::db::{annotations, projects, snippets, users};
use kwicmark_common::{db::init_database, Decision, Role};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A database in a temp directory that lives for the test
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let pool = init_database(&dir.path().join("kwicmark.db"))
        .await
        .expect("init database");
    TestDb { pool, _dir: dir }
}

pub async fn create_project(pool: &SqlitePool, name: &str) -> i64 {
    projects::create(pool, name, None).await.expect("create project")
}

/// Create an annotator and assign them to the project
pub async fn add_annotator(pool: &SqlitePool, username: &str, project_id: i64) -> i64 {
    let user_id = users::create(pool, username, Role::Annotator)
        .await
        .expect("create user");
    projects::assign_user(pool, user_id, project_id)
        .await
        .expect("assign user");
    user_id
}

/// Insert snippets with the given contents, returning their ids
pub async fn add_snippets(pool: &SqlitePool, project_id: i64, contents: &[&str]) -> Vec<i64> {
    let mut tx = pool.begin().await.expect("begin");
    let mut ids = Vec::with_capacity(contents.len());
    for content in contents {
        let id = snippets::insert(&mut tx, project_id, content, Some("kw"))
            .await
            .expect("insert snippet");
        ids.push(id);
    }
    tx.commit().await.expect("commit");
    ids
}

pub async fn annotate(pool: &SqlitePool, user_id: i64, snippet_id: i64, yes: bool) {
    annotations::record(pool, user_id, snippet_id, Decision::from_bool(yes))
        .await
        .expect("record annotation");
}
