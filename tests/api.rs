mod common;

use serde_json::Value;

async fn login(base_url: &str, username: &str, password: &str) -> String {
    let client = reqwest::Client::new();
    let resp: Value = client
        .post(format!("{}/api/v1/auth/login", base_url))
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .await
        .expect("login")
        .json()
        .await
        .expect("parse login response");
    resp["data"]["token"]
        .as_str()
        .expect("login token")
        .to_string()
}

async fn create_user(base_url: &str, admin_token: &str, username: &str, password: &str, role: &str) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/v1/users", base_url))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({
            "username": username,
            "password": password,
            "role": role,
        }))
        .send()
        .await
        .expect("create user");
    assert_eq!(resp.status(), 201, "create user {username}");
}

async fn create_device_type(base_url: &str, admin_token: &str, name: &str) -> String {
    let client = reqwest::Client::new();
    let resp: Value = client
        .post(format!("{}/api/v1/device-types", base_url))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({"name": name}))
        .send()
        .await
        .expect("create device type")
        .json()
        .await
        .expect("parse device type");
    resp["data"]["id"].as_str().expect("device type id").to_string()
}

/// Looks up the seeded reference rows needed to build an asset payload.
async fn reference_ids(base_url: &str, token: &str) -> (String, String, String, String) {
    let client = reqwest::Client::new();

    let statuses: Value = client
        .get(format!("{}/api/v1/statuses", base_url))
        .bearer_auth(token)
        .send()
        .await
        .expect("list statuses")
        .json()
        .await
        .expect("parse statuses");
    let find_status = |name: &str| {
        statuses["data"]
            .as_array()
            .expect("statuses array")
            .iter()
            .find(|s| s["name"] == name)
            .unwrap_or_else(|| panic!("status {name}"))["id"]
            .as_str()
            .expect("status id")
            .to_string()
    };

    let locations: Value = client
        .get(format!("{}/api/v1/locations", base_url))
        .bearer_auth(token)
        .send()
        .await
        .expect("list locations")
        .json()
        .await
        .expect("parse locations");
    let location_id = locations["data"][0]["id"]
        .as_str()
        .expect("location id")
        .to_string();

    (
        find_status("spare"),
        find_status("in-use"),
        find_status("decommissioned"),
        location_id,
    )
}

fn asset_payload(
    serial: &str,
    status_id: &str,
    location_id: &str,
    device_type_id: &str,
) -> Value {
    serde_json::json!({
        "device_name": "MacBook Pro",
        "device_model": "M2 14in",
        "serial_number": serial,
        "status_id": status_id,
        "location_id": location_id,
        "device_type_id": device_type_id,
    })
}

#[tokio::test]
async fn test_auth_flow() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();

    // Unauthenticated requests are rejected.
    let resp = client
        .get(format!("{}/api/v1/assets", server.base_url))
        .send()
        .await
        .expect("list assets");
    assert_eq!(resp.status(), 401);

    // Wrong password is indistinguishable from an unknown user.
    let resp = client
        .post(format!("{}/api/v1/auth/login", server.base_url))
        .json(&serde_json::json!({
            "username": common::ADMIN_USERNAME,
            "password": "wrong-password",
        }))
        .send()
        .await
        .expect("bad login");
    assert_eq!(resp.status(), 401);

    let token = login(&server.base_url, common::ADMIN_USERNAME, common::ADMIN_PASSWORD).await;

    let me: Value = client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("parse me");
    assert_eq!(me["data"]["username"], common::ADMIN_USERNAME);
    assert_eq!(me["data"]["role"], "admin");

    // Self-service profile edits stick.
    let updated: Value = client
        .patch(format!("{}/api/v1/auth/me", server.base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "first_name": "Ada",
            "email": "ada@example.com",
        }))
        .send()
        .await
        .expect("update me")
        .json()
        .await
        .expect("parse update me");
    assert_eq!(updated["data"]["first_name"], "Ada");
    assert_eq!(updated["data"]["email"], "ada@example.com");

    // Change the password, then sign in with the new one.
    let resp = client
        .post(format!("{}/api/v1/auth/change-password", server.base_url))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "current_password": common::ADMIN_PASSWORD,
            "new_password": "a-brand-new-password",
        }))
        .send()
        .await
        .expect("change password");
    assert_eq!(resp.status(), 200);

    let new_token = login(&server.base_url, common::ADMIN_USERNAME, "a-brand-new-password").await;

    // Logout revokes the token it was called with.
    let resp = client
        .post(format!("{}/api/v1/auth/logout", server.base_url))
        .bearer_auth(&new_token)
        .send()
        .await
        .expect("logout");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .bearer_auth(&new_token)
        .send()
        .await
        .expect("me after logout");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_asset_crud_and_audit_trail() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    let device_type_id = create_device_type(&server.base_url, admin, "Laptop").await;
    let (spare_id, in_use_id, decom_id, location_id) =
        reference_ids(&server.base_url, admin).await;

    // Creating straight into decommissioned is rejected.
    let resp = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .json(&asset_payload("SN-100", &decom_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("create decommissioned");
    assert_eq!(resp.status(), 400);

    let created: Value = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .json(&asset_payload("SN-100", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("create asset")
        .json()
        .await
        .expect("parse created asset");
    let asset_id = created["data"]["id"].as_str().expect("asset id").to_string();
    assert_eq!(created["data"]["status_name"], "spare");

    // Serial numbers are unique.
    let resp = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .json(&asset_payload("SN-100", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("duplicate serial");
    assert_eq!(resp.status(), 409);

    // Reassign the device and move it into service.
    let mut payload = asset_payload("SN-100", &in_use_id, &location_id, &device_type_id);
    payload["staff_name"] = Value::String("Jane Doe".to_string());
    let resp = client
        .put(format!("{}/api/v1/assets/{}", server.base_url, asset_id))
        .bearer_auth(admin)
        .json(&payload)
        .send()
        .await
        .expect("update asset");
    assert_eq!(resp.status(), 200);

    let history: Value = client
        .get(format!(
            "{}/api/v1/assets/{}/history",
            server.base_url, asset_id
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("history")
        .json()
        .await
        .expect("parse history");
    let entries = history["data"].as_array().expect("history entries");
    // One "created" row plus one "updated" row per changed field.
    assert_eq!(entries.len(), 3);
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().expect("action"))
        .collect();
    assert_eq!(actions.iter().filter(|a| **a == "created").count(), 1);
    assert_eq!(actions.iter().filter(|a| **a == "updated").count(), 2);
    let status_change = entries
        .iter()
        .find(|e| e["field_name"] == "status")
        .expect("status change entry");
    assert_eq!(status_change["old_value"], "spare");
    assert_eq!(status_change["new_value"], "in-use");

    // The global ledger sees the same rows.
    let audit: Value = client
        .get(format!("{}/api/v1/audit", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("audit")
        .json()
        .await
        .expect("parse audit");
    assert_eq!(audit["total"], 3);

    let resp = client
        .delete(format!("{}/api/v1/assets/{}", server.base_url, asset_id))
        .bearer_auth(admin)
        .send()
        .await
        .expect("delete asset");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/v1/assets/{}", server.base_url, asset_id))
        .bearer_auth(admin)
        .send()
        .await
        .expect("get deleted asset");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_role_permissions() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    create_user(&server.base_url, admin, "viewer", "viewer-password", "viewer").await;
    create_user(&server.base_url, admin, "manager", "manager-password", "manager").await;
    let viewer = login(&server.base_url, "viewer", "viewer-password").await;
    let manager = login(&server.base_url, "manager", "manager-password").await;

    let device_type_id = create_device_type(&server.base_url, admin, "Monitor").await;
    let (spare_id, _, _, location_id) = reference_ids(&server.base_url, admin).await;

    // Viewers can read but not write.
    let resp = client
        .get(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(&viewer)
        .send()
        .await
        .expect("viewer list");
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(&viewer)
        .json(&asset_payload("SN-200", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("viewer create");
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{}/api/v1/audit", server.base_url))
        .bearer_auth(&viewer)
        .send()
        .await
        .expect("viewer audit");
    assert_eq!(resp.status(), 403);

    // Managers can create and edit.
    let created: Value = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(&manager)
        .json(&asset_payload("SN-200", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("manager create")
        .json()
        .await
        .expect("parse manager create");
    let asset_id = created["data"]["id"].as_str().expect("asset id").to_string();

    // But deletion and import are admin-only.
    let resp = client
        .delete(format!("{}/api/v1/assets/{}", server.base_url, asset_id))
        .bearer_auth(&manager)
        .send()
        .await
        .expect("manager delete");
    assert_eq!(resp.status(), 403);

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"a,b\n1,2\n".to_vec()).file_name("assets.csv"),
    );
    let resp = client
        .post(format!("{}/api/v1/assets/import", server.base_url))
        .bearer_auth(&manager)
        .multipart(form)
        .send()
        .await
        .expect("manager import");
    assert_eq!(resp.status(), 403);

    // User administration is admin-only too.
    let resp = client
        .get(format!("{}/api/v1/users", server.base_url))
        .bearer_auth(&manager)
        .send()
        .await
        .expect("manager list users");
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{}/api/v1/assets/{}", server.base_url, asset_id))
        .bearer_auth(admin)
        .send()
        .await
        .expect("admin delete");
    assert_eq!(resp.status(), 200);

    // Admins can reset another user's password outright.
    let users: Value = client
        .get(format!("{}/api/v1/users", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("list users")
        .json()
        .await
        .expect("parse users");
    let manager_id = users["data"]
        .as_array()
        .expect("users array")
        .iter()
        .find(|u| u["username"] == "manager")
        .expect("manager account")["id"]
        .as_str()
        .expect("manager id")
        .to_string();

    let resp = client
        .post(format!(
            "{}/api/v1/users/{}/reset-password",
            server.base_url, manager_id
        ))
        .bearer_auth(admin)
        .json(&serde_json::json!({"password": "a-fresh-password"}))
        .send()
        .await
        .expect("reset password");
    assert_eq!(resp.status(), 200);

    login(&server.base_url, "manager", "a-fresh-password").await;
}

#[tokio::test]
async fn test_csv_import_two_phase() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    create_device_type(&server.base_url, admin, "Laptop").await;

    let upload = |body: &'static str| {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(body.as_bytes().to_vec()).file_name("assets.csv"),
        );
        client
            .post(format!("{}/api/v1/assets/import", server.base_url))
            .bearer_auth(admin)
            .multipart(form)
            .send()
    };

    // A file where every row is bad yields errors and nothing to confirm.
    let rejected: Value = upload(
        "Device Name,Device Model,Serial Number,Device Type,Status,Location,Staff Name\n\
         MacBook,M2,SN-300,Laptop,lost,Headquarters,\n",
    )
    .await
    .expect("upload rejected")
    .json()
    .await
    .expect("parse rejected upload");
    assert!(rejected["data"]["import_id"].is_null());
    assert_eq!(rejected["data"]["valid_rows"], 0);
    assert_eq!(rejected["data"]["errors"][0]["row"], 2);

    // A mixed file stages its valid rows; the bad row is reported but
    // does not block the rest of the batch.
    let mixed: Value = upload(
        "Device Name,Device Model,Serial Number,Device Type,Status,Location,Staff Name\n\
         MacBook,M2,SN-300,Laptop,lost,Headquarters,\n\
         ThinkPad,T14,SN-301,Laptop,spare,Yaba,Jane Doe\n",
    )
    .await
    .expect("upload mixed")
    .json()
    .await
    .expect("parse mixed upload");
    assert_eq!(mixed["data"]["total_rows"], 2);
    assert_eq!(mixed["data"]["valid_rows"], 1);
    assert_eq!(mixed["data"]["errors"].as_array().expect("errors").len(), 1);
    assert_eq!(mixed["data"]["errors"][0]["row"], 2);
    let mixed_import_id = mixed["data"]["import_id"]
        .as_str()
        .expect("mixed import id")
        .to_string();

    // Nothing was created by validation alone.
    let assets: Value = client
        .get(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("list assets")
        .json()
        .await
        .expect("parse assets");
    assert_eq!(assets["total"], 0);

    let confirmed: Value = client
        .post(format!(
            "{}/api/v1/assets/import/{}/confirm",
            server.base_url, mixed_import_id
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("confirm mixed")
        .json()
        .await
        .expect("parse confirm mixed");
    assert_eq!(confirmed["data"]["created"], 1);

    let valid: Value = upload(
        "Device Name,Device Model,Serial Number,Device Type,Status,Location,Staff Name\n\
         MacBook,M2,SN-302,Laptop,spare,Headquarters,\n\
         ThinkPad,T14,SN-303,Laptop,in-use,Yaba,Jane Doe\n",
    )
    .await
    .expect("upload valid")
    .json()
    .await
    .expect("parse valid upload");
    assert_eq!(valid["data"]["valid_rows"], 2);
    assert_eq!(valid["data"]["errors"].as_array().expect("errors").len(), 0);
    let import_id = valid["data"]["import_id"]
        .as_str()
        .expect("import id")
        .to_string();

    let confirmed: Value = client
        .post(format!(
            "{}/api/v1/assets/import/{}/confirm",
            server.base_url, import_id
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("confirm")
        .json()
        .await
        .expect("parse confirm");
    assert_eq!(confirmed["data"]["created"], 2);

    // The claim id is single-use.
    let resp = client
        .post(format!(
            "{}/api/v1/assets/import/{}/confirm",
            server.base_url, import_id
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("confirm again");
    assert_eq!(resp.status(), 404);

    let assets: Value = client
        .get(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("list assets")
        .json()
        .await
        .expect("parse assets");
    assert_eq!(assets["total"], 3);

    // Each imported asset gets one audit row marking the import.
    let audit: Value = client
        .get(format!("{}/api/v1/audit", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("audit")
        .json()
        .await
        .expect("parse audit");
    assert_eq!(audit["total"], 3);
    assert_eq!(audit["data"][0]["action"], "import");
    assert_eq!(audit["data"][0]["new_value"], "Asset imported via CSV");
}

#[tokio::test]
async fn test_csv_export() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    let device_type_id = create_device_type(&server.base_url, admin, "Laptop").await;
    let (spare_id, _, _, location_id) = reference_ids(&server.base_url, admin).await;

    let resp = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .json(&asset_payload("SN-400", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("create asset");
    assert_eq!(resp.status(), 201);

    let resp = client
        .get(format!("{}/api/v1/assets/export", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("export");
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .expect("content type")
            .starts_with("text/csv")
    );

    let body = resp.text().await.expect("export body");
    let mut lines = body.lines();
    assert_eq!(
        lines.next().expect("header line"),
        "Device Name,Device Model,Serial Number,Device Type,Status,Location,Department,Staff Name,Date Modified"
    );
    let row = lines.next().expect("data line");
    assert!(row.contains("SN-400"));
    assert!(row.contains("spare"));
}

#[tokio::test]
async fn test_dashboard_and_analytics() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    let device_type_id = create_device_type(&server.base_url, admin, "Laptop").await;
    let (spare_id, in_use_id, _, location_id) = reference_ids(&server.base_url, admin).await;

    for (serial, status) in [("SN-500", &spare_id), ("SN-501", &in_use_id)] {
        let resp = client
            .post(format!("{}/api/v1/assets", server.base_url))
            .bearer_auth(admin)
            .json(&asset_payload(serial, status, &location_id, &device_type_id))
            .send()
            .await
            .expect("create asset");
        assert_eq!(resp.status(), 201);
    }

    let utilization: Value = client
        .get(format!("{}/api/v1/analytics/utilization", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("utilization")
        .json()
        .await
        .expect("parse utilization");
    assert_eq!(utilization["data"]["active_assets"], 2);
    assert_eq!(utilization["data"]["in_use_assets"], 1);
    assert_eq!(utilization["data"]["utilization_rate"], 50.0);

    let dashboard: Value = client
        .get(format!("{}/api/v1/dashboard", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("dashboard")
        .json()
        .await
        .expect("parse dashboard");
    let stats = &dashboard["data"]["stats"];
    assert_eq!(stats["total_assets"], 2);
    assert_eq!(stats["active_assets"], 2);
    assert_eq!(stats["decommissioned_assets"], 0);
    assert_eq!(stats["assets_this_month"], 2);
    let recent = dashboard["data"]["recent_activity"]
        .as_array()
        .expect("recent activity");
    assert_eq!(recent.len(), 2);

    let chart: Value = client
        .get(format!(
            "{}/api/v1/analytics/chart-data?type=trends",
            server.base_url
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("chart data")
        .json()
        .await
        .expect("parse chart data");
    assert_eq!(chart["data"]["created"][0]["count"], 2);

    let chart: Value = client
        .get(format!(
            "{}/api/v1/analytics/chart-data?type=status",
            server.base_url
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("status chart")
        .json()
        .await
        .expect("parse status chart");
    let labels = chart["data"]["labels"].as_array().expect("chart labels");
    let values = chart["data"]["values"].as_array().expect("chart values");
    assert_eq!(labels.len(), 2);
    assert_eq!(labels.len(), values.len());

    let resp = client
        .get(format!(
            "{}/api/v1/analytics/chart-data?type=bogus",
            server.base_url
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("bogus chart");
    assert_eq!(resp.status(), 400);

    let bundle: Value = client
        .get(format!("{}/api/v1/dashboard/export", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("dashboard export")
        .json()
        .await
        .expect("parse dashboard export");
    assert!(bundle["generated_at"].is_string());
    assert_eq!(bundle["statistics"]["total_assets"], 2);
    assert_eq!(bundle["utilization"]["utilization_rate"], 50.0);

    let metrics: Value = client
        .post(format!("{}/api/v1/metrics/generate", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("generate metrics")
        .json()
        .await
        .expect("parse metrics");
    assert_eq!(metrics["data"]["total_assets"], 2);
    assert_eq!(metrics["data"]["in_use_assets"], 1);
}

#[tokio::test]
async fn test_directory_stub() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    // Too-short queries return an empty result rather than scanning.
    let resp: Value = client
        .get(format!("{}/api/v1/directory/search?q=a", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("short search")
        .json()
        .await
        .expect("parse short search");
    assert_eq!(resp["data"].as_array().expect("results").len(), 0);

    // Manually added entries are searchable straight away.
    let resp = client
        .post(format!("{}/api/v1/directory/users", server.base_url))
        .bearer_auth(admin)
        .json(&serde_json::json!({
            "username": "jdoe",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jdoe@example.com",
        }))
        .send()
        .await
        .expect("create directory user");
    assert_eq!(resp.status(), 201);

    // Usernames are unique within the directory.
    let resp = client
        .post(format!("{}/api/v1/directory/users", server.base_url))
        .bearer_auth(admin)
        .json(&serde_json::json!({"username": "jdoe"}))
        .send()
        .await
        .expect("duplicate directory user");
    assert_eq!(resp.status(), 409);

    let found: Value = client
        .get(format!("{}/api/v1/directory/search?q=jane", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("parse search");
    assert_eq!(found["data"][0]["username"], "jdoe");
    assert_eq!(found["data"][0]["full_name"], "Jane Doe");

    let listing: Value = client
        .get(format!("{}/api/v1/directory/users", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("list directory users")
        .json()
        .await
        .expect("parse directory users");
    assert_eq!(listing["data"]["total_users"], 1);
    assert_eq!(listing["data"]["active_users"], 1);
    assert_eq!(listing["data"]["ad_synced_users"], 0);

    let sync: Value = client
        .post(format!("{}/api/v1/directory/sync", server.base_url))
        .bearer_auth(admin)
        .send()
        .await
        .expect("sync")
        .json()
        .await
        .expect("parse sync");
    assert_eq!(sync["data"]["success"], false);
    assert_eq!(
        sync["data"]["message"],
        "Active Directory integration not yet configured"
    );
    assert_eq!(sync["data"]["synced_count"], 0);
}

#[tokio::test]
async fn test_reference_data_lifecycle() {
    let server = common::TestServer::start().await;
    let client = reqwest::Client::new();
    let admin = &server.admin_token;

    let device_type_id = create_device_type(&server.base_url, admin, "Printer").await;
    let (spare_id, _, _, location_id) = reference_ids(&server.base_url, admin).await;

    // Duplicate names are rejected.
    let resp = client
        .post(format!("{}/api/v1/device-types", server.base_url))
        .bearer_auth(admin)
        .json(&serde_json::json!({"name": "Printer"}))
        .send()
        .await
        .expect("duplicate device type");
    assert_eq!(resp.status(), 409);

    let resp = client
        .post(format!("{}/api/v1/assets", server.base_url))
        .bearer_auth(admin)
        .json(&asset_payload("SN-600", &spare_id, &location_id, &device_type_id))
        .send()
        .await
        .expect("create asset");
    assert_eq!(resp.status(), 201);

    // A referenced device type cannot be deleted.
    let resp = client
        .delete(format!(
            "{}/api/v1/device-types/{}",
            server.base_url, device_type_id
        ))
        .bearer_auth(admin)
        .send()
        .await
        .expect("delete referenced device type");
    assert_eq!(resp.status(), 409);

    let departments: Value = client
        .post(format!("{}/api/v1/departments", server.base_url))
        .bearer_auth(admin)
        .json(&serde_json::json!({"name": "Finance"}))
        .send()
        .await
        .expect("create department")
        .json()
        .await
        .expect("parse department");
    let dept_id = departments["data"]["id"].as_str().expect("dept id");

    // Departments are deletable even when referenced; assets fall back
    // to unassigned.
    let resp = client
        .delete(format!("{}/api/v1/departments/{}", server.base_url, dept_id))
        .bearer_auth(admin)
        .send()
        .await
        .expect("delete department");
    assert_eq!(resp.status(), 200);
}
