mod common;

use common::Sidecar;
use serde_json::json;

#[test]
fn resolve_gates_views_by_role() {
    let mut sc = Sidecar::start();

    let anonymous = sc.ok("views.resolve", json!({ "path": "/projects" }));
    assert_eq!(anonymous, json!({ "decision": "redirect", "to": "login" }));
    let unknown = sc.ok("views.resolve", json!({ "path": "/nowhere" }));
    assert_eq!(unknown["decision"], "unknown");

    sc.make_student("alice@uni.edu", "R1");
    sc.login("alice@uni.edu");
    let allowed = sc.ok("views.resolve", json!({ "path": "/project/p-42" }));
    assert_eq!(allowed["decision"], "allow");
    assert_eq!(allowed["view"], "project/:projectId");
    assert_eq!(allowed["params"]["projectId"], "p-42");
    let redirected = sc.ok("views.resolve", json!({ "path": "/faculty/dashboard" }));
    assert_eq!(redirected, json!({ "decision": "redirect", "to": "projects" }));

    sc.make_faculty("prof@uni.edu");
    sc.login("prof@uni.edu");
    let create = sc.ok("views.resolve", json!({ "path": "faculty/assessments/create" }));
    assert_eq!(create["view"], "faculty/assessments/create");
    let redirected = sc.ok("views.resolve", json!({ "path": "manage/user" }));
    assert_eq!(redirected["to"], "faculty/dashboard");

    sc.ok("auth.logout", json!({}));
    let after = sc.ok("views.resolve", json!({ "path": "/dashboard" }));
    assert_eq!(after["to"], "login");
}

#[test]
fn closed_view_cancels_its_requests() {
    let mut sc = Sidecar::start();
    sc.make_student("alice@uni.edu", "R1");
    sc.login("alice@uni.edu");

    sc.ok("views.open", json!({ "viewId": "projects-1" }));
    let listed = sc.ok("projects.list", json!({ "viewId": "projects-1" }));
    assert!(listed.is_array());

    let closed = sc.ok("views.close", json!({ "viewId": "projects-1" }));
    assert_eq!(closed["closed"], true);
    assert_eq!(
        sc.err("projects.list", json!({ "viewId": "projects-1" })),
        "cancelled"
    );
    assert_eq!(
        sc.err("projects.list", json!({ "viewId": "never-opened" })),
        "cancelled"
    );
    // Untagged requests are unaffected.
    sc.ok("projects.list", json!({}));

    // Reopening starts a fresh scope.
    sc.ok("views.open", json!({ "viewId": "projects-1" }));
    sc.ok("projects.list", json!({ "viewId": "projects-1" }));
    let health = sc.ok("health", json!({}));
    assert_eq!(health["openViews"], json!(["projects-1"]));

    // Signing out closes every scope.
    sc.ok("auth.logout", json!({}));
    let health = sc.ok("health", json!({}));
    assert_eq!(health["openViews"], json!([]));
}
