//! Full session lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through the default `reqwest` transport.

use mock_server::{ADMIN_PASSWORD, ADMIN_USERNAME};
use stack_client::{
    ClientConfig, ErrorStatus, InputResourceControl, InputStack, PatchStack, StackClient, StackVars,
};

/// Start the mock server on a random port and return its address.
async fn start_server() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await.unwrap() });
    addr
}

fn vars(pairs: &[(&str, &str)]) -> StackVars {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn session_lifecycle() {
    let addr = start_server().await;
    // The UI path is replaced by the API root.
    let mut client = StackClient::new(&format!("http://{addr}/dashboard/"));

    // Step 1: nothing works before login.
    assert!(!client.is_authorized());
    let err = client.get_teams().await.unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(401));
    assert_eq!(err.message, "Unauthorized");

    // Step 2: bad credentials leave the client unauthenticated.
    let err = client.login(ADMIN_USERNAME, "wrong").await.unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(422));
    assert!(!client.is_authorized());

    // Step 3: login.
    client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
    assert!(client.is_authorized());

    // Step 4: a later failed login keeps the session.
    client.login(ADMIN_USERNAME, "wrong").await.unwrap_err();
    assert!(client.is_authorized());

    // Step 5: reads.
    let teams = client.get_teams().await.unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].name, "developers");

    let swarm = client.get_swarm(1).await.unwrap();
    assert!(!swarm.id.is_empty());
    assert_eq!(client.get_swarm(1).await.unwrap(), swarm);
    assert!(client.get_stacks(&swarm.id).await.unwrap().is_empty());

    // Step 6: create a stack.
    let input = InputStack {
        endpoint_id: 1,
        name: "web".to_string(),
        stack: "version: '3'\nservices:\n  web:\n    image: nginx".to_string(),
        vars: vars(&[("PORT", "8080"), ("HOST", "example.com")]),
    };
    let created = client.create_stack(&input).await.unwrap();
    assert_eq!(created.name, "web");
    assert_ne!(created.resource_control.id, created.id);

    // Step 7: the same name conflicts.
    let err = client.create_stack(&input).await.unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(409));

    // Step 8: creation on an unknown endpoint fails at the swarm lookup.
    let err = client
        .create_stack(&InputStack {
            endpoint_id: 99,
            ..input.clone()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(404));

    // Step 9: list — the stack is on endpoint 1's swarm only.
    let stacks = client.get_stacks(&swarm.id).await.unwrap();
    assert_eq!(stacks, vec![created.clone()]);
    let other = client.get_swarm(2).await.unwrap();
    assert!(client.get_stacks(&other.id).await.unwrap().is_empty());

    // Step 10: update.
    let patch = PatchStack {
        id: created.id,
        endpoint_id: 1,
        stack: "version: '3'\nservices: {}".to_string(),
        vars: vars(&[("PORT", "9090")]),
        prune: true,
    };
    client.update_stack(&patch).await.unwrap();

    let err = client
        .update_stack(&PatchStack {
            id: created.id + 1000,
            ..patch.clone()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status, ErrorStatus::Http(404));

    // Step 11: rewrite access control using only some fields.
    let answer = client
        .set_resource_control(&InputResourceControl {
            id: created.resource_control.id,
            public: Some(true),
            teams: Some(vec![teams[1].id]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(answer["Public"], true);
    assert_eq!(answer["AdministratorsOnly"], false);
    assert_eq!(answer["Teams"], serde_json::json!([2]));
    assert_eq!(answer["Users"], serde_json::json!([]));
}

#[tokio::test]
async fn connection_failure_is_placeholder_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let mut client = StackClient::from_config(&ClientConfig {
        base_url: format!("http://{addr}"),
        timeout_secs: Some(5),
    });

    let err = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap_err();
    assert!(err.is_placeholder());
    assert_eq!(err.to_string(), "status: message (details)");
    assert!(!client.is_authorized());
}

#[tokio::test]
async fn malformed_address_surfaces_at_call_time() {
    let client = StackClient::new("not a url");
    let err = client.get_teams().await.unwrap_err();
    assert!(err.is_placeholder());
}
