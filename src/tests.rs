//! Integration tests for the LinkVault backend.

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat};
use crate::db::{init_database, Repository};
use crate::preservation::ArtifactStore;
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const INSTANCE_URL: &str = "https://links.example.com";

fn test_config(dir: &Path, psk: Option<String>) -> Config {
    Config {
        api_psk: psk,
        db_path: dir.join("test.sqlite"),
        index_path: dir.join("index"),
        storage_path: dir.join("storage"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_format: LogFormat::Text,
        instance_url: INSTANCE_URL.to_string(),
        email_enabled: false,
        max_file_buffer_mib: 1,
        stripe_enabled: false,
        google_sso_enabled: false,
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let psk = "test-api-key".to_string();
        let mut config = test_config(temp_dir.path(), Some(psk.clone()));
        adjust(&mut config);

        let pool = init_database(&config.db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&config.index_path).expect("Failed to init search"));
        let store =
            Arc::new(ArtifactStore::open(&config.storage_path).expect("Failed to init storage"));

        let state = AppState {
            repo,
            search,
            store,
            config: Arc::new(config),
        };

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", psk.parse().unwrap());

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, user: i64, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).header("x-user-id", user)
    }

    fn post(&self, user: i64, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).header("x-user-id", user)
    }

    fn put(&self, user: i64, path: &str) -> RequestBuilder {
        self.client.put(self.url(path)).header("x-user-id", user)
    }

    fn delete(&self, user: i64, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).header("x-user-id", user)
    }

    async fn create_user(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/users"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn user(&self, username: &str) -> i64 {
        self.create_user(json!({ "username": username }))
            .await["id"]
            .as_i64()
            .unwrap()
    }

    async fn collection(&self, user: i64, body: Value) -> Value {
        let resp = self.post(user, "/api/collections").json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn link(&self, user: i64, body: Value) -> Value {
        let resp = self.post(user, "/api/links").json(&body).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn upload(&self, user: i64, link_id: i64, format: &str, mime: &str, bytes: Vec<u8>) -> reqwest::Response {
        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes).file_name("upload.bin").mime_str(mime).unwrap(),
            )
            .text("id", link_id.to_string())
            .text("format", format.to_string());
        self.post(user, "/api/preserved")
            .multipart(form)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = Client::new().get(fixture.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_rejections() {
    let fixture = TestFixture::new().await;

    // No API key at all
    let resp = Client::new().get(fixture.url("/api/revision")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Wrong API key
    let resp = Client::new()
        .get(fixture.url("/api/revision"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Bearer form is accepted
    let resp = Client::new()
        .get(fixture.url("/api/revision"))
        .header("authorization", "Bearer test-api-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Valid key but no acting user
    let resp = fixture.client.get(fixture.url("/api/users/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    // Acting user that does not exist
    let resp = fixture.get(999, "/api/users/me").send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let resp = fixture.client.get(fixture.url("/api/revision")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let initial = body["data"]["revisionId"].as_i64().unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({ "username": "reviser" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial + 1);
    let user = body["data"]["id"].as_i64().unwrap();

    let resp = fixture
        .post(user, "/api/collections")
        .json(&json!({ "name": "Reading" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial + 2);

    // Reads do not move the revision
    let resp = fixture.get(user, "/api/collections").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["revisionId"].as_i64().unwrap(), initial + 2);
}

#[tokio::test]
async fn test_user_validation_without_email() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({ "username": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "username");

    let user = fixture.user("alice").await;

    let resp = fixture
        .put(user, "/api/users/me")
        .json(&json!({ "username": "al" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .put(user, "/api/users/me")
        .json(&json!({ "username": "alice_2", "linksRouteTo": "PDF", "locale": "de" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice_2");
    assert_eq!(body["data"]["linksRouteTo"], "PDF");
    assert!(body["data"].get("passwordHash").is_none());

    // Username taken by someone else
    let other = fixture.user("bob").await;
    let resp = fixture
        .put(other, "/api/users/me")
        .json(&json!({ "username": "alice_2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_email_change_requires_password() {
    let fixture = TestFixture::with_config(|c| {
        c.email_enabled = true;
        c.google_sso_enabled = true;
    })
    .await;

    let user = fixture
        .create_user(json!({ "email": "Old@Example.com", "password": "correct-horse" }))
        .await;
    assert_eq!(user["email"], "old@example.com");
    let user = user["id"].as_i64().unwrap();

    let resp = fixture
        .post(user, "/api/users/me/email-change")
        .json(&json!({ "email": "new@example.com" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["oldEmail"], "old@example.com");
    assert_eq!(body["data"]["requiresPassword"], true);
    // Base warning plus the SSO one; billing is not configured.
    assert_eq!(body["data"]["warnings"].as_array().unwrap().len(), 2);

    let resp = fixture
        .put(user, "/api/users/me")
        .json(&json!({ "email": "new@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .put(user, "/api/users/me")
        .json(&json!({ "email": "new@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .put(user, "/api/users/me")
        .json(&json!({ "email": "new@example.com", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "new@example.com");
}

#[tokio::test]
async fn test_private_profile_visibility() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let friend = fixture.user("friend").await;
    let stranger = fixture.user("stranger").await;

    let resp = fixture
        .put(owner, "/api/users/me")
        .json(&json!({ "username": "owner", "isPrivate": true, "whitelistedUsers": ["friend"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture.get(friend, &format!("/api/users/{}", owner)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["username"], "owner");

    let resp = fixture.get(stranger, &format!("/api/users/{}", owner)).send().await.unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_collection_view_members_and_subcollections() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let first = fixture.user("first").await;
    let second = fixture.user("second").await;

    let parent = fixture.collection(owner, json!({ "name": "Parent" })).await;
    let parent_id = parent["id"].as_i64().unwrap();
    fixture
        .collection(owner, json!({ "name": "Child", "parentId": parent_id }))
        .await;

    // Members submitted out of order
    let resp = fixture
        .put(owner, &format!("/api/collections/{}", parent_id))
        .json(&json!({
            "id": parent_id,
            "name": "Parent",
            "members": [
                { "userId": second, "canCreate": true, "canUpdate": false, "canDelete": false },
                { "userId": first, "canCreate": false, "canUpdate": false, "canDelete": false }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    for name in ["b", "a", "c"] {
        fixture
            .link(owner, json!({ "name": name, "url": format!("https://{}.example.com", name), "collection": { "id": parent_id } }))
            .await;
    }

    let resp = fixture
        .get(owner, &format!("/api/collections/{}?sort=2", parent_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let view = &body["data"];
    let member_ids: Vec<i64> = view["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["userId"].as_i64().unwrap())
        .collect();
    assert_eq!(member_ids, vec![first, second]);
    assert_eq!(view["subcollections"].as_array().unwrap().len(), 1);
    assert_eq!(view["subcollections"][0]["name"], "Child");
    assert_eq!(view["collection"]["name"], "Parent");
    assert_eq!(view["linkCount"], 3);
    assert_eq!(view["permissions"], true);
    assert_eq!(view["owner"]["username"], "owner");
    let names: Vec<&str> = view["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(view["openUrls"].as_array().unwrap().len(), 3);

    // A member sees their own flags
    let resp = fixture
        .get(second, &format!("/api/collections/{}", parent_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["permissions"]["canCreate"], true);
    assert_eq!(body["data"]["permissions"]["canDelete"], false);

    // An outsider is turned away
    let outsider = fixture.user("outsider").await;
    let resp = fixture
        .get(outsider, &format!("/api/collections/{}", parent_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_collection_cannot_move_under_descendant() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;

    let parent = fixture.collection(owner, json!({ "name": "Parent" })).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let child = fixture
        .collection(owner, json!({ "name": "Child", "parentId": parent_id }))
        .await;
    let child_id = child["id"].as_i64().unwrap();

    let resp = fixture
        .put(owner, &format!("/api/collections/{}", parent_id))
        .json(&json!({ "id": parent_id, "name": "Parent", "parentId": child_id, "members": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Detaching the child to the top level works
    let resp = fixture
        .put(owner, &format!("/api/collections/{}", child_id))
        .json(&json!({ "id": child_id, "name": "Child", "parentId": "root", "members": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["parentId"].is_null());
}

#[tokio::test]
async fn test_link_crud_and_concurrency() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;

    // No collection given: lands in "Unorganized"
    let link = fixture
        .link(owner, json!({ "url": "https://a.com", "tags": [{ "name": "rust" }] }))
        .await;
    let link_id = link["id"].as_i64().unwrap();
    assert_eq!(link["collection"]["name"], "Unorganized");
    assert_eq!(link["href"], "https://a.com");
    assert_eq!(link["tags"][0]["name"], "rust");
    let collection_id = link["collectionId"].as_i64().unwrap();

    let resp = fixture
        .put(owner, &format!("/api/links/{}", link_id))
        .json(&json!({
            "id": link_id,
            "name": "A site",
            "collection": { "id": collection_id, "ownerId": owner },
            "tags": [],
            "pinnedBy": [{ "id": owner }],
            "expectedVersion": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "A site");
    assert_eq!(body["data"]["pinned"], true);
    assert!(body["data"]["tags"].as_array().unwrap().is_empty());

    // Stale version
    let resp = fixture
        .put(owner, &format!("/api/links/{}", link_id))
        .json(&json!({
            "id": link_id,
            "collection": { "id": collection_id, "ownerId": owner },
            "tags": [],
            "expectedVersion": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);

    let resp = fixture
        .get(owner, "/api/links?pinnedOnly=true")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = fixture.delete(owner, &format!("/api/links/{}", link_id)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = fixture.get(owner, &format!("/api/links/{}", link_id)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_link_field_errors() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;

    let resp = fixture
        .post(owner, "/api/links")
        .json(&json!({ "url": "not a url", "tags": [{ "name": "x".repeat(51) }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    let fields: Vec<&str> = body["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"url"));
    assert!(fields.contains(&"tags.0.name"));
}

#[tokio::test]
async fn test_upload_serve_and_href() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    fixture
        .put(owner, "/api/users/me")
        .json(&json!({ "username": "owner", "linksRouteTo": "PDF" }))
        .send()
        .await
        .unwrap();

    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();
    // Preferred artifact missing: raw URL
    assert_eq!(link["href"], "https://a.com");

    let pdf = b"%PDF-1.4 test".to_vec();
    let resp = fixture
        .upload(owner, link_id, "pdf", "application/pdf", pdf.clone())
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["data"]["href"],
        format!("{}/preserved/{}?format=pdf", INSTANCE_URL, link_id)
    );
    assert!(body["data"]["lastPreserved"].is_string());

    let resp = fixture
        .get(owner, &format!("/preserved/{}?format=pdf", link_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(resp.bytes().await.unwrap().to_vec(), pdf);

    // Not captured yet
    let resp = fixture
        .get(owner, &format!("/preserved/{}?format=monolith", link_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Someone else cannot read it
    let stranger = fixture.user("stranger").await;
    let resp = fixture
        .get(stranger, &format!("/preserved/{}?format=pdf", link_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_upload_size_limit() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();
    let max = 1024 * 1024;

    let resp = fixture
        .upload(owner, link_id, "readability", "text/plain", vec![b'a'; max])
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .upload(owner, link_id, "readability", "text/plain", vec![b'a'; max + 1])
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "file");
    assert_eq!(body["error"]["details"]["fields"][0]["message"], "Max file size is 1MB.");

    let resp = fixture
        .upload(owner, link_id, "pdf", "application/zip", b"PK".to_vec())
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_delete_collection_removes_artifacts() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let parent = fixture.collection(owner, json!({ "name": "Parent" })).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let child = fixture
        .collection(owner, json!({ "name": "Child", "parentId": parent_id }))
        .await;
    let child_id = child["id"].as_i64().unwrap();

    let link = fixture
        .link(owner, json!({ "url": "https://a.com", "collection": { "id": child_id } }))
        .await;
    let link_id = link["id"].as_i64().unwrap();
    let resp = fixture
        .upload(owner, link_id, "png", "image/png", vec![1, 2, 3])
        .await;
    assert_eq!(resp.status(), 200);

    let artifact = fixture
        .temp_dir
        .path()
        .join("storage")
        .join(format!("archives/{}/{}.png", child_id, link_id));
    assert!(artifact.exists());

    let resp = fixture
        .delete(owner, &format!("/api/collections/{}", parent_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["left"], false);
    assert_eq!(body["data"]["deletedLinkCount"], 1);
    assert!(!artifact.exists());

    let resp = fixture.get(owner, &format!("/api/links/{}", link_id)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_highlight_offsets() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();

    let resp = fixture
        .post(owner, "/api/highlights")
        .json(&json!({ "color": "yellow", "startOffset": 10, "endOffset": 10, "text": "x", "linkId": link_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "endOffset");

    let resp = fixture
        .post(owner, "/api/highlights")
        .json(&json!({ "color": "yellow", "startOffset": 1, "endOffset": 10, "text": "quote", "linkId": link_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .get(owner, &format!("/api/links/{}/highlights", link_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tags_and_search() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let stranger = fixture.user("stranger").await;

    fixture
        .link(owner, json!({ "name": "Tokio tutorial", "url": "https://tokio.rs", "tags": [{ "name": "async" }] }))
        .await;
    fixture
        .link(owner, json!({ "name": "Gardening", "url": "https://plants.example.com" }))
        .await;

    let resp = fixture.get(owner, "/api/search?q=tokio").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["link"]["name"], "Tokio tutorial");

    // Other users never see links they cannot read
    let resp = fixture.get(stranger, "/api/search?q=tokio").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["results"].as_array().unwrap().is_empty());

    let resp = fixture.get(owner, "/api/tags").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let tag_id = body["data"][0]["id"].as_i64().unwrap();
    assert_eq!(body["data"][0]["linkCount"], 1);

    let resp = fixture
        .put(owner, &format!("/api/tags/{}", tag_id))
        .json(&json!({ "name": "concurrency" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture.get(owner, "/api/search?q=concurrency").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);

    let resp = fixture.delete(stranger, &format!("/api/tags/{}", tag_id)).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let resp = fixture.delete(owner, &format!("/api/tags/{}", tag_id)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_archive_action_requeues_links() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();
    fixture
        .upload(owner, link_id, "pdf", "application/pdf", b"%PDF".to_vec())
        .await;

    let resp = fixture
        .post(owner, "/api/links/archive")
        .json(&json!({ "action": "allAndRePreserve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["linkIds"], json!([link_id]));

    let resp = fixture.get(owner, &format!("/api/links/{}", link_id)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["pdf"].is_null());
    assert!(body["data"]["lastPreserved"].is_null());

    let resp = fixture
        .post(owner, "/api/links/archive")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_rss_and_dashboard() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;

    let resp = fixture
        .post(owner, "/api/rss")
        .json(&json!({ "name": "Blog", "url": "https://blog.example.com/feed", "collectionName": "Feeds" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture.get(owner, "/api/collections").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let feeds = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Feeds")
        .cloned()
        .unwrap();

    let resp = fixture.get(owner, "/api/dashboard").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["type"], "STATS");

    let resp = fixture
        .put(owner, "/api/dashboard")
        .json(&json!([
            { "type": "COLLECTION", "collectionId": feeds["id"], "enabled": true },
            { "type": "PINNED_LINKS", "enabled": false }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["collectionId"], feeds["id"]);
    assert_eq!(body["data"][1]["enabled"], false);

    let resp = fixture
        .put(owner, "/api/dashboard")
        .json(&json!([{ "type": "COLLECTION", "enabled": true }]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_unknown_acting_user_is_rejected_everywhere() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let parent = fixture.collection(owner, json!({ "name": "Open" })).await;
    let parent_id = parent["id"].as_i64().unwrap();
    fixture
        .put(owner, &format!("/api/collections/{}", parent_id))
        .json(&json!({ "id": parent_id, "name": "Open", "isPublic": true, "members": [] }))
        .send()
        .await
        .unwrap();
    let link = fixture
        .link(owner, json!({ "url": "https://a.com", "collection": { "id": parent_id } }))
        .await;
    let link_id = link["id"].as_i64().unwrap();
    fixture
        .upload(owner, link_id, "pdf", "application/pdf", b"%PDF".to_vec())
        .await;

    let ghost = 999;
    let highlight = json!({ "color": "yellow", "startOffset": 0, "endOffset": 4, "text": "x", "linkId": link_id });
    let requests = vec![
        fixture.get(ghost, "/api/collections"),
        fixture.get(ghost, &format!("/api/collections/{}", parent_id)),
        fixture
            .put(ghost, &format!("/api/collections/{}", parent_id))
            .json(&json!({ "id": parent_id, "name": "Mine", "members": [] })),
        fixture.delete(ghost, &format!("/api/collections/{}", parent_id)),
        fixture.post(ghost, "/api/highlights").json(&highlight),
        fixture.get(ghost, &format!("/api/links/{}/highlights", link_id)),
        fixture.delete(ghost, "/api/highlights/1"),
        fixture.get(ghost, "/api/tags"),
        fixture.put(ghost, "/api/tags/1").json(&json!({ "name": "x" })),
        fixture.delete(ghost, "/api/tags/1"),
        fixture.get(ghost, "/api/rss"),
        fixture.delete(ghost, "/api/rss/1"),
        fixture.get(ghost, "/api/dashboard"),
        fixture.get(ghost, "/api/search?q=a"),
        fixture.get(ghost, &format!("/preserved/{}?format=pdf", link_id)),
    ];

    for request in requests {
        let resp = request.send().await.unwrap();
        let url = resp.url().to_string();
        assert_eq!(resp.status(), 401, "{}", url);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED", "{}", url);
    }
}

#[tokio::test]
async fn test_collection_view_hides_private_children_from_outsiders() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let outsider = fixture.user("outsider").await;

    let parent = fixture.collection(owner, json!({ "name": "Parent" })).await;
    let parent_id = parent["id"].as_i64().unwrap();
    let resp = fixture
        .put(owner, &format!("/api/collections/{}", parent_id))
        .json(&json!({ "id": parent_id, "name": "Parent", "isPublic": true, "members": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let secret = fixture
        .collection(owner, json!({ "name": "SecretChild", "parentId": parent_id }))
        .await;
    let secret_id = secret["id"].as_i64().unwrap();

    let resp = fixture
        .get(outsider, &format!("/api/collections/{}", secret_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = fixture
        .get(outsider, &format!("/api/collections/{}", parent_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["subcollections"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["permissions"], false);

    // The owner still sees it
    let resp = fixture
        .get(owner, &format!("/api/collections/{}", parent_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["subcollections"][0]["name"], "SecretChild");
}

#[tokio::test]
async fn test_collection_view_open_urls_cover_every_page() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let collection = fixture.collection(owner, json!({ "name": "Many" })).await;
    let collection_id = collection["id"].as_i64().unwrap();

    for i in 0..3 {
        fixture
            .link(owner, json!({ "url": format!("https://{}.example.com", i), "collection": { "id": collection_id } }))
            .await;
    }

    let resp = fixture
        .get(owner, &format!("/api/collections/{}?limit=2", collection_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["linkCount"], 3);
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["openUrls"].as_array().unwrap().len(), 3);

    let resp = fixture
        .get(owner, &format!("/api/collections/{}?limit=2&offset=2", collection_id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["openUrls"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_archive_keeps_stored_files() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();
    let collection_id = link["collectionId"].as_i64().unwrap();
    let resp = fixture
        .upload(owner, link_id, "pdf", "application/pdf", b"%PDF".to_vec())
        .await;
    assert_eq!(resp.status(), 200);

    // Make the row reset fail underneath the running server.
    let db_url = format!("sqlite:{}", fixture.temp_dir.path().join("test.sqlite").display());
    let pool = sqlx::SqlitePool::connect(&db_url).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER block_reset BEFORE UPDATE OF pdf ON links WHEN NEW.pdf IS NULL \
         BEGIN SELECT RAISE(ABORT, 'reset blocked'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let resp = fixture
        .post(owner, "/api/links/archive")
        .json(&json!({ "linkIds": [link_id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let artifact = fixture
        .temp_dir
        .path()
        .join("storage")
        .join(format!("archives/{}/{}.pdf", collection_id, link_id));
    assert!(artifact.exists());
    let resp = fixture
        .get(owner, &format!("/preserved/{}?format=pdf", link_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_upload_bumps_version_and_replaces_image() {
    let fixture = TestFixture::new().await;
    let owner = fixture.user("owner").await;
    let link = fixture.link(owner, json!({ "url": "https://a.com" })).await;
    let link_id = link["id"].as_i64().unwrap();
    let collection_id = link["collectionId"].as_i64().unwrap();
    assert_eq!(link["version"], 1);

    let resp = fixture
        .upload(owner, link_id, "png", "image/png", vec![1, 2, 3])
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["version"], 2);

    let resp = fixture
        .upload(owner, link_id, "jpeg", "image/jpeg", vec![4, 5, 6])
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["version"], 3);

    let dir = fixture
        .temp_dir
        .path()
        .join("storage")
        .join(format!("archives/{}", collection_id));
    assert!(!dir.join(format!("{}.png", link_id)).exists());
    assert!(dir.join(format!("{}.jpeg", link_id)).exists());

    // An update made against the pre-upload version is stale.
    let resp = fixture
        .put(owner, &format!("/api/links/{}", link_id))
        .json(&json!({
            "id": link_id,
            "collection": { "id": collection_id, "ownerId": owner },
            "tags": [],
            "expectedVersion": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}
