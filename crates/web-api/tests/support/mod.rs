#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use application::{
    ChatCoordinator, IdentityVerifier, SessionRegistry, StatsService, SystemClock, TokenIssuer,
    UserService, UserServiceDependencies,
};
use config::{JwtConfig, RealtimeConfig};
use infrastructure::{
    BcryptPasswordHasher, JwtAuthService, MemoryMessageRepository, MemoryUserRepository,
};
use web_api::{router, AppState};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 跑在随机端口上的完整服务实例，内存仓储，析构时自动关闭
pub struct TestApp {
    pub addr: SocketAddr,
    /// 暴露出来以便测试注入存储故障
    pub message_store: Arc<MemoryMessageRepository>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn spawn_app() -> TestApp {
    let user_repository = Arc::new(MemoryUserRepository::new());
    let message_store = Arc::new(MemoryMessageRepository::new());

    let users: Arc<dyn domain::UserRepository> = user_repository.clone();
    let messages: Arc<dyn domain::MessageRepository> = message_store.clone();

    // 测试用最低 bcrypt cost，降低耗时
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(Some(4)));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let auth_service = Arc::new(JwtAuthService::new(
        JwtConfig {
            secret: "integration-test-secret-key-with-32-chars".to_string(),
            expiration_hours: 24,
        },
        users.clone(),
    ));

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: users.clone(),
        password_hasher,
        clock: clock.clone(),
    }));
    let stats_service = Arc::new(StatsService::new(users.clone(), messages.clone()));

    let realtime = RealtimeConfig {
        mailbox_capacity: 64,
        op_timeout_secs: 2,
    };

    let registry = Arc::new(SessionRegistry::new());
    let coordinator = Arc::new(ChatCoordinator::new(
        registry,
        messages,
        clock,
        Duration::from_secs(realtime.op_timeout_secs),
    ));

    let state = AppState::new(
        user_service,
        stats_service,
        coordinator,
        auth_service.clone() as Arc<dyn IdentityVerifier>,
        auth_service as Arc<dyn TokenIssuer>,
        realtime,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // 等待服务器启动
    sleep(Duration::from_millis(50)).await;

    TestApp {
        addr,
        message_store,
        shutdown: Some(shutdown_tx),
    }
}

/// 注册用户并返回其 token 与用户记录
pub async fn register(
    client: &reqwest::Client,
    app: &TestApp,
    username: &str,
    password: &str,
) -> (String, serde_json::Value) {
    let response = client
        .post(app.http("/api/auth/register"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("register request");
    assert_eq!(response.status(), 201, "注册应返回 201");

    let body: serde_json::Value = response.json().await.expect("register json");
    let token = body["token"].as_str().expect("token").to_string();
    (token, body["user"].clone())
}

pub async fn connect_ws(app: &TestApp, token: &str) -> WsStream {
    let (ws, _) = connect_async(app.ws_url(token)).await.expect("ws connect");
    ws
}

pub async fn send_event(ws: &mut WsStream, event: serde_json::Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("send event");
}

/// 持续读取直到出现指定类型的事件，超时视为失败
pub async fn wait_for_event(ws: &mut WsStream, event_type: &str) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(2), wait_for_event_inner(ws, event_type))
        .await
        .unwrap_or_else(|_| panic!("等待事件 {event_type} 超时"))
}

/// 持续读取直到看到指定用户的 user:join。
/// 连接自身的 user:join 也会先到达，用用户名过滤掉。
pub async fn wait_for_user_join(ws: &mut WsStream, username: &str) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = wait_for_event_inner(ws, "user:join").await;
            if event["username"] == username {
                return;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("等待 {username} 的 user:join 超时"))
}

/// 收集事件直到谓词命中（包含命中的那条），返回收到的全部事件
pub async fn collect_until(
    ws: &mut WsStream,
    pred: impl Fn(&serde_json::Value) -> bool,
) -> Vec<serde_json::Value> {
    tokio::time::timeout(Duration::from_secs(2), async {
        let mut events = Vec::new();
        loop {
            let message = ws
                .next()
                .await
                .expect("等待事件时连接已结束")
                .expect("ws error");
            if let Message::Text(text) = message {
                let value: serde_json::Value = serde_json::from_str(&text).expect("event json");
                let done = pred(&value);
                events.push(value);
                if done {
                    return events;
                }
            }
        }
    })
    .await
    .expect("收集事件超时")
}

async fn wait_for_event_inner(ws: &mut WsStream, event_type: &str) -> serde_json::Value {
    loop {
        let message = ws
            .next()
            .await
            .unwrap_or_else(|| panic!("等待 {event_type} 时连接已结束"))
            .expect("ws error");
        if let Message::Text(text) = message {
            let value: serde_json::Value = serde_json::from_str(&text).expect("event json");
            if value["type"] == event_type {
                return value;
            }
        }
    }
}

/// 在给定时间窗口内断言不会出现指定类型的事件（其它事件被丢弃）
pub async fn assert_no_event(ws: &mut WsStream, event_type: &str, window: Duration) {
    let result = tokio::time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&text).expect("event json");
                    if value["type"] == event_type {
                        return value;
                    }
                }
                Some(Ok(_)) => continue,
                // 连接结束或出错：不可能再出现目标事件，等超时窗口走完
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;

    if let Ok(event) = result {
        panic!("不应出现事件 {event_type}: {event}");
    }
}
