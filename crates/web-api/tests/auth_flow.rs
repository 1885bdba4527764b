mod support;

use serde_json::json;

#[tokio::test]
async fn register_login_and_profile_crud() {
    let app = support::spawn_app().await;
    let client = reqwest::Client::new();

    let (token, user) = support::register(&client, &app, "alice", "secret").await;
    assert_eq!(user["username"], "alice");
    assert!(user.get("password_hash").is_none(), "密码哈希不应出现在应答里");

    // 重名注册被拒绝
    let response = client
        .post(app.http("/api/auth/register"))
        .json(&json!({"username": "alice", "password": "other"}))
        .send()
        .await
        .expect("duplicate register");
    assert_eq!(response.status(), 409);

    // 缺字段注册被拒绝
    let response = client
        .post(app.http("/api/auth/register"))
        .json(&json!({"username": "", "password": ""}))
        .send()
        .await
        .expect("empty register");
    assert_eq!(response.status(), 400);

    // 错误密码登录被拒绝
    let response = client
        .post(app.http("/api/auth/login"))
        .json(&json!({"username": "alice", "password": "wrong"}))
        .send()
        .await
        .expect("bad login");
    assert_eq!(response.status(), 401);

    // 正确凭据登录
    let response = client
        .post(app.http("/api/auth/login"))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .expect("login");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("login json");
    assert!(body["token"].as_str().is_some());

    // 当前用户信息
    let me: serde_json::Value = client
        .get(app.http("/api/users/me"))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("me json");
    assert_eq!(me["username"], "alice");

    // 改名
    let updated: serde_json::Value = client
        .put(app.http("/api/users/me"))
        .header("authorization", format!("Bearer {token}"))
        .json(&json!({"username": "alicia"}))
        .send()
        .await
        .expect("update")
        .json()
        .await
        .expect("update json");
    assert_eq!(updated["username"], "alicia");

    // 删除账号后旧 token 立即失效
    let response = client
        .delete(app.http("/api/users/me"))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("delete account");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("delete json");
    assert_eq!(body["message"], "User deleted");

    let response = client
        .get(app.http("/api/users/me"))
        .header("authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("me after delete");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn missing_or_malformed_bearer_is_rejected() {
    let app = support::spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.http("/api/users/me"))
        .send()
        .await
        .expect("me without token");
    assert_eq!(response.status(), 401);

    let response = client
        .get(app.http("/api/users/me"))
        .header("authorization", "Token abc")
        .send()
        .await
        .expect("me with malformed header");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn websocket_upgrade_rejects_invalid_token() {
    let app = support::spawn_app().await;

    // 伪造凭据：升级被拒，不会建立连接
    let result = tokio_tungstenite::connect_async(app.ws_url("not-a-real-token")).await;
    assert!(result.is_err(), "无效 token 不应完成 WebSocket 升级");

    let result = tokio_tungstenite::connect_async(app.ws_url("")).await;
    assert!(result.is_err(), "缺失 token 不应完成 WebSocket 升级");
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = support::spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.http("/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(response.status(), 200);
}
