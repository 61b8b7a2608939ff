mod common;

use hyper::StatusCode;

use common::{titles, TestApp};

#[tokio::test]
async fn test_search_cat() {
    let app = TestApp::new();
    let anna = app.register("anna").await;
    let bob = app.register("bob").await;
    let cathy = app.register("cathy").await;
    app.pin(&anna, "My cat", "pets").await;
    app.pin(&bob, "Sleepy", "Catnap").await;
    app.pin(&bob, "Dog", "pets").await;
    app.pin(&cathy, "CATS everywhere", "misc").await;

    let reply = app.get("/?q=cat", &anna).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["query"], "cat");
    assert_eq!(
        titles(&reply.json["pins"]),
        vec!["CATS everywhere", "Sleepy"]
    );
    let users: Vec<&str> = reply.json["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(users, vec!["cathy"]);

    let tags_only = app.get("/?q=%23cat", &anna).await;
    assert_eq!(titles(&tags_only.json["pins"]), vec!["Sleepy"]);
}

#[tokio::test]
async fn test_search_includes_own_boards() {
    let app = TestApp::new();
    let anna = app.register("anna").await;
    let a = app.pin(&anna, "a", "x").await;
    let b = app.pin(&anna, "b", "x").await;
    app.board(&anna, "Catalogue", &[a, b]).await;

    let reply = app.get("/?q=CAT", &anna).await;
    assert_eq!(titles(&reply.json["boards"]), vec!["Catalogue"]);
    assert_eq!(reply.json["boards"][0]["pin_count"], 2);

    let home = app.get("/", &anna).await;
    assert!(home.json["boards"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommendations_follow_search_history() {
    let app = TestApp::new();
    let anna = app.register("anna").await;
    let bob = app.register("bob").await;
    let carl = app.register("carl").await;
    app.pin(&anna, "Mine", "autumn").await;
    app.pin(&bob, "Leaves", "Autumn").await;
    app.pin(&carl, "Car", "cars").await;
    app.pin(&carl, "Bike", "bikes").await;

    let home = app.get("/", &anna).await;
    assert_eq!(home.json["query"], serde_json::Value::Null);
    assert_eq!(titles(&home.json["pins"]), vec!["Bike", "Car", "Leaves"]);

    app.get("/?q=%23autumn", &anna).await;
    let home = app.get("/", &anna).await;
    assert_eq!(titles(&home.json["pins"]), vec!["Leaves", "Bike", "Car"]);

    app.get("/?q=carl", &anna).await;
    let home = app.get("/?q=+", &anna).await;
    assert_eq!(titles(&home.json["pins"]), vec!["Bike", "Car", "Leaves"]);
}
