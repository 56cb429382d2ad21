use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use kindred_db::Database;
use kindred_server::config::ServerConfig;
use kindred_server::{router, state_with_db};

struct TestApp {
    app: Router,
    upload_dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

impl TestApp {
    fn new() -> Self {
        let upload_dir =
            std::env::temp_dir().join(format!("kindred-test-{}", uuid::Uuid::new_v4()));
        let config = ServerConfig {
            jwt_secret: "test-secret".into(),
            upload_dir: upload_dir.clone(),
            public_url: "http://kindred.test".into(),
            ..Default::default()
        };
        let state = state_with_db(Database::open_in_memory().unwrap(), &config);
        Self {
            app: router(state),
            upload_dir,
        }
    }

    async fn raw(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    async fn send_full(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, headers, bytes) = self.raw(req).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, json) = self.send_full(method, uri, token, body).await;
        (status, json)
    }

    async fn signup(&self, name: &str, email: &str, pin: &str) {
        let (status, _) = self
            .send(
                "POST",
                "/auth/signup",
                None,
                Some(json!({ "name": name, "email": email, "pin": pin })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn login(&self, email: &str, pin: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": email, "pin": pin })),
        )
        .await
    }

    /// Two fresh accounts paired with each other. Returns both tokens and the code.
    async fn couple(&self, a: &str, b: &str) -> (String, String, String) {
        self.signup("Ana", a, "1234").await;
        self.signup("Ben", b, "5678").await;

        let (status, body) = self
            .send("POST", "/pair", None, Some(json!({ "email": a, "pin": "1234" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let code = body["partnerCode"].as_str().unwrap().to_string();

        let (status, body) = self
            .send(
                "POST",
                "/pair",
                None,
                Some(json!({ "email": b, "pin": "5678", "partnerCode": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (_, body) = self.login(a, "1234").await;
        let token_a = body["token"].as_str().unwrap().to_string();
        let (_, body) = self.login(b, "5678").await;
        let token_b = body["token"].as_str().unwrap().to_string();
        (token_a, token_b, code)
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, _, body) = app
        .raw(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn signup_validates_and_refuses_duplicates() {
    let app = TestApp::new();
    app.signup("Ana", "a@example.com", "1234").await;

    let (status, body) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "name": "Again", "email": "a@example.com", "pin": "0000" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, _) = app
        .send(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "b@example.com", "pin": "0000" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_requires_a_completed_pairing() {
    let app = TestApp::new();
    app.signup("Ana", "a@example.com", "1234").await;

    let (status, body) = app.login("a@example.com", "1234").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "You must pair with your partner before using chat."
    );

    let (status, _) = app.login("a@example.com", "9999").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("nobody@example.com", "1234").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pairing_flow() {
    let app = TestApp::new();
    app.signup("Ana", "a@example.com", "1234").await;
    app.signup("Ben", "b@example.com", "5678").await;

    let (status, _) = app
        .send(
            "POST",
            "/pair",
            None,
            Some(json!({ "email": "a@example.com", "pin": "0000" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/pair",
            None,
            Some(json!({ "email": "a@example.com", "pin": "1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["partnerCode"].as_str().unwrap().to_string();
    assert!(kindred_api::pairing::is_pair_code(&code), "bad code {code}");

    let (status, _) = app
        .send(
            "POST",
            "/pair",
            None,
            Some(json!({ "email": "b@example.com", "pin": "5678", "partnerCode": "ZZZ999" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            "POST",
            "/pair",
            None,
            Some(json!({ "email": "b@example.com", "pin": "5678", "partnerCode": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Paired successfully");

    let (_, body) = app
        .send(
            "POST",
            "/pair",
            None,
            Some(json!({ "email": "a@example.com", "pin": "1234" })),
        )
        .await;
    assert_eq!(body["message"], "Already paired");

    let (status, headers, body) = app
        .send_full(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "a@example.com", "pin": "1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("kindred="));
    assert!(cookie.contains("HttpOnly"));

    let token = body["token"].as_str().unwrap();
    let (status, user) = app.send("GET", "/user", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["isPaired"], true);
    assert_eq!(user["partnerCode"], code.as_str());
    assert_eq!(user["pairedWith"], "b@example.com");
    assert_eq!(user["partnerName"], "Ben");
    assert_eq!(user["relationshipStatus"], "active");
}

#[tokio::test]
async fn session_cookie_authenticates_rest_calls() {
    let app = TestApp::new();
    let (token, _, _) = app.couple("a@example.com", "b@example.com").await;

    let (status, _) = app.send("GET", "/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::get("/user")
        .header(header::COOKIE, format!("theme=dark; kindred={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.raw(req).await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::get("/user")
        .header(header::COOKIE, "theme=dark")
        .header(header::COOKIE, format!("kindred={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.raw(req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("GET", "/user", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn profile_updates() {
    let app = TestApp::new();
    let (token, _, _) = app.couple("a@example.com", "b@example.com").await;

    let (status, _) = app
        .send("PATCH", "/user", Some(&token), Some(json!({ "name": " A " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("PATCH", "/user", Some(&token), Some(json!({ "name": "Anna" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");

    let (status, _) = app
        .send(
            "POST",
            "/user/pin",
            Some(&token),
            Some(json!({ "oldPin": "0000", "newPin": "4321" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            "POST",
            "/user/pin",
            Some(&token),
            Some(json!({ "oldPin": "1234", "newPin": "4321" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.login("a@example.com", "4321").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn notes_are_scoped_to_the_pair() {
    let app = TestApp::new();
    let (ana, ben, _) = app.couple("a@example.com", "b@example.com").await;
    let (outsider, _, _) = app.couple("c@example.com", "d@example.com").await;

    let (status, note) = app
        .send("POST", "/notes", Some(&ana), Some(json!({ "content": "buy flowers" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["title"], "Untitled");
    assert_eq!(note["color"], "bg-pink-100");
    assert_eq!(note["createdBy"], "Ana");
    let id = note["id"].as_str().unwrap().to_string();

    let (_, listed) = app.send("GET", "/notes", Some(&ben), None).await;
    assert_eq!(listed["notes"].as_array().unwrap().len(), 1);
    let (_, listed) = app.send("GET", "/notes", Some(&outsider), None).await;
    assert!(listed["notes"].as_array().unwrap().is_empty());

    let (status, body) = app
        .send("PATCH", &format!("/notes/{id}/favorite"), Some(&ben), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFavorite"], true);

    let (status, _) = app
        .send(
            "PUT",
            &format!("/notes/{id}"),
            Some(&ben),
            Some(json!({ "title": "Errands" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = app.send("GET", "/notes", Some(&ana), None).await;
    assert_eq!(listed["notes"][0]["title"], "Errands");
    assert_eq!(listed["notes"][0]["content"], "buy flowers");

    let (status, _) = app
        .send("DELETE", &format!("/notes/{id}"), Some(&outsider), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send("DELETE", &format!("/notes/{id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send("DELETE", &format!("/notes/{id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reminders_crud() {
    let app = TestApp::new();
    let (ana, _, _) = app.couple("a@example.com", "b@example.com").await;

    let (status, _) = app
        .send("POST", "/reminders", Some(&ana), Some(json!({ "title": "anniversary" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reminder) = app
        .send(
            "POST",
            "/reminders",
            Some(&ana),
            Some(json!({
                "title": "anniversary",
                "description": "dinner",
                "date": "2026-02-14T18:00:00.000Z",
                "time": "19:30",
                "priority": "high"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reminder["date"], "2026-02-14");
    assert_eq!(reminder["email"], "a@example.com");
    assert_eq!(reminder["isCompleted"], false);
    let id = reminder["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/reminders/{id}"),
            Some(&ana),
            Some(json!({ "priority": "low" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send("PATCH", &format!("/reminders/{id}/complete"), Some(&ana), None)
        .await;
    assert_eq!(body["isCompleted"], true);

    let (_, listed) = app.send("GET", "/reminders", Some(&ana), None).await;
    let stored = &listed["reminders"][0];
    assert_eq!(stored["priority"], "low");
    assert_eq!(stored["description"], "dinner");
    assert_eq!(stored["isCompleted"], true);

    let (status, _) = app
        .send("DELETE", &format!("/reminders/{id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send("DELETE", &format!("/reminders/{id}"), Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gallery_upload_is_served_back() {
    let app = TestApp::new();
    let (ana, ben, _) = app.couple("a@example.com", "b@example.com").await;

    let boundary = "kindred-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
         sunset\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"../beach day.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         fake-jpeg-bytes\r\n\
         --{boundary}--\r\n"
    );
    let req = Request::post("/gallery")
        .header(header::AUTHORIZATION, format!("Bearer {ana}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _, bytes) = app.raw(req).await;
    assert_eq!(status, StatusCode::CREATED);
    let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
    let url = uploaded["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://kindred.test/uploads/"));
    assert!(url.ends_with("_beach_day.jpg"));

    let (_, listed) = app.send("GET", "/gallery", Some(&ben), None).await;
    assert_eq!(listed["gallery"][0]["caption"], "sunset");
    assert_eq!(listed["gallery"][0]["uploadedBy"], "Ana");

    let path = url.trim_start_matches("http://kindred.test");
    let (status, _, served) = app
        .raw(Request::get(path).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, b"fake-jpeg-bytes");
}

#[tokio::test]
async fn rest_messages_share_the_conversation() {
    let app = TestApp::new();
    let (ana, ben, _) = app.couple("a@example.com", "b@example.com").await;

    let (_, body) = app.send("GET", "/messages", Some(&ben), None).await;
    assert!(body["messages"].as_array().unwrap().is_empty());

    let (status, sent) = app
        .send(
            "POST",
            "/messages",
            Some(&ana),
            Some(json!({ "type": "text", "content": "good morning" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["message"]["senderEmail"], "a@example.com");

    let (_, body) = app.send("GET", "/messages", Some(&ben), None).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "good morning");
    assert_eq!(messages[0]["senderEmail"], "a@example.com");
}

#[tokio::test]
async fn breakup_and_patchup() {
    let app = TestApp::new();
    let (ana, _, _) = app.couple("a@example.com", "b@example.com").await;

    let (status, _) = app
        .send("PATCH", "/relationship/status", Some(&ana), Some(json!({ "status": "bored" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("POST", "/relationship/breakup", Some(&ana), Some(json!({ "reason": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/relationship/breakup",
            Some(&ana),
            Some(json!({ "reason": "need space" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.login("b@example.com", "5678").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("need space"));

    let (status, body) = app
        .send(
            "GET",
            "/relationship/breakup?email=b@example.com&pin=5678",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["breakupReason"], "need space");
    assert_eq!(body["youRequested"], false);

    let (status, _) = app.send("GET", "/relationship/breakup", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/relationship/patchup",
            None,
            Some(json!({ "email": "b@example.com", "pin": "5678" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Waiting"));

    let (_, body) = app
        .send("GET", "/relationship/breakup", Some(&ana), None)
        .await;
    assert_eq!(body["partnerRequested"], true);

    let (status, body) = app
        .send("POST", "/relationship/patchup", Some(&ana), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Patch-up complete!");

    let (status, _) = app.login("b@example.com", "5678").await;
    assert_eq!(status, StatusCode::OK);
}
