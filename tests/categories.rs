mod common;

use mail_loader::load::prepare_categories;
use mail_loader::taxonomy::Taxonomy;

#[tokio::test]
async fn preparation_is_idempotent() {
    let Some(test_db) = common::test_database("preparation_is_idempotent").await else {
        return;
    };
    let pool = test_db.pool_clone();
    let taxonomy = Taxonomy::email_default();
    let mut conn = pool.acquire().await.expect("connection");

    let first = prepare_categories(&mut conn, &taxonomy).await.expect("first run");
    let second = prepare_categories(&mut conn, &taxonomy).await.expect("second run");

    assert_eq!(first.len(), 9);
    assert_eq!(first, second, "ids are stable across runs");
    for name in taxonomy.names() {
        assert!(first.get(name).is_some(), "{name} has an id");
        let copies: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM Categories WHERE categoryName = $1")
                .bind(name)
                .fetch_one(&pool)
                .await
                .expect("count query");
        assert_eq!(copies, 1, "{name} stored exactly once");
    }
    assert_eq!(common::count_rows(&pool, "Categories").await, 9);

    drop(conn);
    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn mapping_includes_preexisting_categories() {
    let Some(test_db) = common::test_database("mapping_includes_preexisting_categories").await
    else {
        return;
    };
    let pool = test_db.pool_clone();

    let archive_id: i32 = sqlx::query_scalar(
        "INSERT INTO Categories (categoryName) VALUES ('archive') RETURNING categoryID",
    )
    .fetch_one(&pool)
    .await
    .expect("seed category");
    let work_id: i32 = sqlx::query_scalar(
        "INSERT INTO Categories (categoryName) VALUES ('work') RETURNING categoryID",
    )
    .fetch_one(&pool)
    .await
    .expect("seed category");

    let mut conn = pool.acquire().await.expect("connection");
    let categories = prepare_categories(&mut conn, &Taxonomy::email_default())
        .await
        .expect("prepared");

    assert_eq!(categories.len(), 10);
    assert_eq!(categories.get("archive"), Some(archive_id));
    assert_eq!(categories.get("work"), Some(work_id), "existing id is reused");
    assert_eq!(common::count_rows(&pool, "Categories").await, 10);

    drop(conn);
    test_db.close().await.expect("failed to drop test database");
}
