use resource_framework::{Method, Request, Response};
use resource_recipe::config::AppConfig;
use resource_recipe::lifecycle::ApiSystem;
use resource_recipe::model::{fixtures, Role};
use resource_recipe::user_api::hooks::{CALLER_HEADER, ROLE_HEADER};
use serde_json::{json, Value};

async fn seeded_system() -> ApiSystem {
    let system = ApiSystem::new(&AppConfig::default()).expect("system starts");
    system.seed(&fixtures::users()).await.expect("seed");
    system
}

async fn create(system: &ApiSystem, body: Value) -> Response {
    system
        .dispatch(Method::Post, "/users", Request::new().with_body(body))
        .await
}

fn hedy() -> Value {
    json!({"name": "Hedy", "email": "hedy@example.com", "password": "frequency-hopping"})
}

fn id_of(response: &Response) -> String {
    response.body["_id"]
        .as_str()
        .expect("response carries an id")
        .to_string()
}

fn names(response: &Response) -> Vec<String> {
    response
        .body
        .as_array()
        .expect("array body")
        .iter()
        .map(|u| u["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_index_returns_oldest_page_without_passwords() {
    let system = seeded_system().await;

    let response = system
        .dispatch(Method::Get, "/users.json", Request::new())
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "application/json");

    let expected: Vec<String> = fixtures::users()
        .into_iter()
        .take(10)
        .map(|u| u.name)
        .collect();
    assert_eq!(names(&response), expected);

    for user in response.body.as_array().unwrap() {
        assert!(user.get("password").is_none());
        assert!(user.get("role").is_none(), "role is hidden by default");
    }

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_index_sort_and_paging_from_query() {
    let system = seeded_system().await;

    let response = system
        .dispatch(
            Method::Get,
            "/users",
            Request::new()
                .with_query("sort", "-createdAt")
                .with_query("limit", "3")
                .with_query("skip", "1"),
        )
        .await;

    let expected: Vec<String> = fixtures::users()
        .into_iter()
        .rev()
        .skip(1)
        .take(3)
        .map(|u| u.name)
        .collect();
    assert_eq!(names(&response), expected);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_count_all_and_filtered() {
    let system = seeded_system().await;
    let users = fixtures::users();

    let all = system
        .dispatch(Method::Get, "/users/count", Request::new())
        .await;
    assert_eq!(all.body, json!({"count": users.len()}));

    let subscribers = system
        .dispatch(
            Method::Get,
            "/users/count.json",
            Request::new().with_query("role", "Subscriber"),
        )
        .await;
    assert_eq!(
        subscribers.body,
        json!({"count": fixtures::count_role(&users, Role::Subscriber)})
    );

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_then_show() {
    let system = seeded_system().await;

    let mut body = hedy();
    body["email"] = json!("  Hedy@Example.COM ");
    body["role"] = json!("Admin");
    let created = create(&system, body).await;
    assert_eq!(created.status, 200);
    assert!(created.body.get("password").is_none());
    assert_eq!(created.body["__v"], json!(0));
    assert_eq!(created.body["email"], json!("hedy@example.com"));

    let id = id_of(&created);
    let shown = system
        .dispatch(
            Method::Get,
            &format!("/users/{id}"),
            Request::new().with_query("select", "+role"),
        )
        .await;
    assert_eq!(shown.status, 200);
    assert_eq!(shown.body["name"], json!("Hedy"));
    // Only admins pick their own role.
    assert_eq!(shown.body["role"], json!("Subscriber"));
    assert!(shown.body.get("password").is_none());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_create_is_rejected() {
    let system = seeded_system().await;

    let response = create(&system, json!({"name": "Hedy", "email": "hedy@example.com"})).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["error"], json!("ValidationError"));

    let count = system
        .dispatch(Method::Get, "/users/count", Request::new())
        .await;
    assert_eq!(count.body["count"], json!(fixtures::users().len()));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_update_requires_owner_or_admin() {
    let system = seeded_system().await;
    let id = id_of(&create(&system, hedy()).await);
    let member = format!("/users/{id}");
    let rename = || json!({"name": "Hedy Lamarr"});

    let anonymous = system
        .dispatch(Method::Put, &member, Request::new().with_body(rename()))
        .await;
    assert_eq!(anonymous.status, 401);
    assert_eq!(anonymous.body["error"], json!("AuthorizationError"));

    let stranger = system
        .dispatch(
            Method::Put,
            &member,
            Request::new()
                .with_header(CALLER_HEADER, "user_1")
                .with_body(rename()),
        )
        .await;
    assert_eq!(stranger.status, 401);

    let shown = system.dispatch(Method::Get, &member, Request::new()).await;
    assert_eq!(shown.body["name"], json!("Hedy"));
    assert_eq!(shown.body["__v"], json!(0));

    let owner = system
        .dispatch(
            Method::Put,
            &member,
            Request::new()
                .with_header(CALLER_HEADER, id.as_str())
                .with_body(rename()),
        )
        .await;
    assert_eq!(owner.status, 200);
    assert_eq!(owner.body["name"], json!("Hedy Lamarr"));
    assert_eq!(owner.body["__v"], json!(1));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_non_admin_cannot_change_role() {
    let system = seeded_system().await;
    let id = id_of(&create(&system, hedy()).await);
    let member = format!("/users/{id}");

    let response = system
        .dispatch(
            Method::Put,
            &member,
            Request::new()
                .with_header(CALLER_HEADER, id.as_str())
                .with_body(json!({"role": "Admin"})),
        )
        .await;
    assert_eq!(response.status, 200);

    let admin_view = system
        .dispatch(
            Method::Get,
            &member,
            Request::new().with_query("select", "+role"),
        )
        .await;
    assert_eq!(admin_view.body["role"], json!("Subscriber"));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let system = seeded_system().await;
    let id = id_of(&create(&system, hedy()).await);

    let response = system
        .dispatch(
            Method::Put,
            &format!("/users/{id}"),
            Request::new()
                .with_header(CALLER_HEADER, id.as_str())
                .with_body(json!({"name": "Hedy Lamarr", "__v": 7})),
        )
        .await;
    assert_eq!(response.status, 409);
    assert_eq!(response.body["error"], json!("ConflictError"));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_admin_destroys_any_user() {
    let system = seeded_system().await;
    let id = id_of(&create(&system, hedy()).await);
    let member = format!("/users/{id}");

    let removed = system
        .dispatch(
            Method::Delete,
            &member,
            Request::new()
                .with_header(CALLER_HEADER, "user_1")
                .with_header(ROLE_HEADER, "Admin"),
        )
        .await;
    assert_eq!(removed.status, 200);
    assert_eq!(removed.body["_id"], json!(id));
    assert!(removed.body.get("password").is_none());

    let gone = system.dispatch(Method::Get, &member, Request::new()).await;
    assert_eq!(gone.status, 404);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_and_unfilled_format() {
    let system = seeded_system().await;

    let unknown = system
        .dispatch(Method::Delete, "/users", Request::new())
        .await;
    assert_eq!(unknown.status, 404);
    assert_eq!(unknown.body["message"], json!("Not found: Cannot DELETE /users"));

    let count = system
        .dispatch(Method::Get, "/users/count.:format?", Request::new())
        .await;
    assert_eq!(count.status, 200);
    assert_eq!(count.content_type, "application/json");
    assert_eq!(count.body, json!({"count": fixtures::users().len()}));

    let xml = system
        .dispatch(Method::Get, "/users.xml", Request::new())
        .await;
    assert_eq!(xml.status, 200);
    assert_eq!(names(&xml).len(), 10);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reset_empties_the_collection() {
    let system = seeded_system().await;

    assert_eq!(system.reset().await.unwrap(), fixtures::users().len());
    let count = system
        .dispatch(Method::Get, "/users/count", Request::new())
        .await;
    assert_eq!(count.body, json!({"count": 0}));

    system.shutdown().await.unwrap();
}
