mod common;

// self
use bearer_client::{
	_preludet::*,
	http::ApiRequest,
	session::{Notice, NoticeKind},
};
use common::*;

fn bearer(token: &str) -> Option<String> {
	Some(format!("Bearer {token}"))
}

/// Answers 200 with the request path for `fresh`, 401 for anything else, and rotates the pair on
/// the refresh endpoint.
fn rotating_server(fresh: String, fresh_refresh: String) -> ScriptedTransport {
	ScriptedTransport::new(move |request| {
		if request.path == REFRESH_PATH || request.path == INITIALIZE_PATH {
			return respond(200, refresh_body(&fresh, &fresh_refresh), None);
		}
		if request.authorization == bearer(&fresh) {
			respond(200, request.path.clone(), None)
		} else {
			respond(401, "expired", Some("trace-401"))
		}
	})
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let (a2, r2) = (user_access("A2"), refresh_token("R2"));
	let transport = rotating_server(a2.clone(), r2.clone());
	let gate = transport.gate(REFRESH_PATH);
	let (client, _, hooks) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let handles: Vec<_> = (0..5)
		.map(|i| {
			let client = client.clone();

			tokio::spawn(async move { client.execute(ApiRequest::get(format!("/items/{i}"))).await })
		})
		.collect();

	gate.arrival().await;
	eventually(|| client.queued_requests().len() == 5).await;

	assert!(client.is_refreshing());

	gate.open();

	for (i, handle) in handles.into_iter().enumerate() {
		let response = handle
			.await
			.expect("Request task should not panic.")
			.expect("Queued request should resolve after the refresh.");

		assert_eq!(response.text(), format!("/api/items/{i}"));
	}

	let transport = client.transport();

	assert_eq!(transport.calls_to(REFRESH_PATH), 1);
	assert_eq!(client.tokens().access_token().map(|t| t.expose().to_owned()), Some(a2));
	assert_eq!(client.tokens().refresh_token().map(|t| t.expose().to_owned()), Some(r2));
	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(client.refresh_metrics().successes(), 1);
	assert_eq!(client.refresh_metrics().replays(), 5);
	assert!(!client.is_refreshing());
	assert!(client.queued_requests().is_empty());
	assert!(hooks.notices().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queued_requests_replay_in_arrival_order() {
	let a2 = user_access("A2");
	let transport = rotating_server(a2.clone(), refresh_token("R2"));
	let gate = transport.gate(REFRESH_PATH);
	let (client, _, _) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let mut handles = Vec::new();

	for (expected, path) in ["/a", "/b", "/c"].into_iter().enumerate() {
		let task_client = client.clone();

		handles.push(tokio::spawn(async move { task_client.execute(ApiRequest::get(path)).await }));

		if expected == 0 {
			gate.arrival().await;
		}

		eventually(|| client.queued_requests().len() == expected + 1).await;
	}

	let queued: Vec<_> = client.queued_requests().into_iter().map(|info| info.path).collect();

	assert_eq!(queued, ["/a", "/b", "/c"]);

	gate.open();

	for handle in handles {
		handle.await.expect("Request task should not panic.").expect("Replay should succeed.");
	}

	let replayed: Vec<_> = client
		.transport()
		.sent()
		.into_iter()
		.filter(|request| request.authorization == bearer(&a2))
		.map(|request| request.path)
		.collect();

	assert_eq!(replayed, ["/api/a", "/api/b", "/api/c"]);
}

#[tokio::test]
async fn refresh_call_carries_both_tokens() {
	let (a1, r1) = (user_access("A1"), refresh_token("R1"));
	let (client, _, _) = build_client(rotating_server(user_access("A2"), refresh_token("R2")));

	seed(&client, &a1, &r1);

	client.refresh().await.expect("Explicit refresh should succeed.");

	let sent = client.transport().sent();
	let refresh = sent
		.iter()
		.find(|request| request.path == REFRESH_PATH)
		.expect("Refresh call should be logged.");

	assert_eq!(refresh.authorization, bearer(&a1));
	assert_eq!(refresh.refresh_header, bearer(&r1));
	assert_eq!(refresh.content_type.as_deref(), Some("application/json;charset=UTF-8"));
}

#[tokio::test]
async fn anonymous_sessions_use_initialize_endpoint() {
	let (client, _, _) = build_client(rotating_server(user_access("A2"), refresh_token("R2")));

	client.refresh().await.expect("Anonymous refresh should succeed.");

	let sent = client.transport().sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].path, INITIALIZE_PATH);
	assert_eq!(sent[0].authorization.as_deref(), Some("Bearer "));
	assert!(client.tokens().is_authenticated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_is_a_no_op_while_another_cycle_runs() {
	let transport = rotating_server(user_access("A2"), refresh_token("R2"));
	let gate = transport.gate(REFRESH_PATH);
	let (client, _, _) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let leader = {
		let client = client.clone();

		tokio::spawn(async move { client.refresh().await })
	};

	gate.arrival().await;
	client.refresh().await.expect("Concurrent refresh should return immediately.");
	gate.open();
	leader.await.expect("Refresh task should not panic.").expect("Leader refresh should succeed.");

	assert_eq!(client.transport().calls_to(REFRESH_PATH), 1);
	assert_eq!(client.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn replayed_unauthorized_request_is_not_retried_again() {
	let transport = ScriptedTransport::new(|request| {
		if request.path == REFRESH_PATH {
			respond(200, refresh_body(&user_access("A2"), &refresh_token("R2")), None)
		} else {
			respond(401, "still forbidden", Some("trace-retry"))
		}
	});
	let (client, _, hooks) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let err = client
		.execute(ApiRequest::get("/locked"))
		.await
		.expect_err("A replay that gets 401 should fail.");

	assert!(err.is_unauthorized());
	assert_eq!(err.trace_id(), Some("trace-retry"));
	assert_eq!(client.transport().calls_to(REFRESH_PATH), 1);
	assert_eq!(client.transport().calls_to("/api/locked"), 2);
	assert!(!client.is_refreshing());
	assert!(hooks.redirects().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_credentials_replay_without_second_refresh() {
	let a2 = user_access("A2");
	let transport = rotating_server(a2.clone(), refresh_token("R2"));
	let slow = transport.gate("/api/slow");
	let (client, _, _) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let pending = {
		let client = client.clone();

		tokio::spawn(async move { client.execute(ApiRequest::get("/slow")).await })
	};

	slow.arrival().await;
	client.refresh().await.expect("Refresh should succeed.");
	slow.open();

	let response = pending
		.await
		.expect("Request task should not panic.")
		.expect("Stale request should be replayed with the new token.");

	assert_eq!(response.text(), "/api/slow");
	assert_eq!(client.transport().calls_to(REFRESH_PATH), 1);
	assert_eq!(client.transport().calls_to("/api/slow"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refresh_failure_rejects_every_queued_request() {
	let transport = ScriptedTransport::new(|request| {
		if request.path == REFRESH_PATH {
			respond(401, "refresh revoked", Some("trace-9"))
		} else {
			respond(401, "expired", None)
		}
	});
	let gate = transport.gate(REFRESH_PATH);
	let (client, store, hooks) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let handles: Vec<_> = (0..3)
		.map(|i| {
			let client = client.clone();

			tokio::spawn(async move { client.execute(ApiRequest::get(format!("/r/{i}"))).await })
		})
		.collect();

	gate.arrival().await;
	eventually(|| client.queued_requests().len() == 3).await;
	gate.open();

	for handle in handles {
		let err = handle
			.await
			.expect("Request task should not panic.")
			.expect_err("Queued requests should fail with the refresh.");

		assert!(matches!(err, Error::Status { status: 401, .. }));
		assert_eq!(err.trace_id(), Some("trace-9"));
	}

	assert!(store.is_empty(), "Tokens should be cleared after a failed refresh.");
	assert_eq!(hooks.notices(), vec![Notice::session_expired(Some("trace-9".into()))]);
	assert_eq!(hooks.notices()[0].kind, NoticeKind::SessionExpired);
	assert_eq!(hooks.redirects(), vec!["/login".to_owned()]);
	assert_eq!(client.refresh_metrics().failures(), 1);
	assert!(!client.is_refreshing());
	assert_eq!(client.transport().calls_to(REFRESH_PATH), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_refresh_body_fails_the_cycle() {
	let transport = ScriptedTransport::new(|request| {
		if request.path == REFRESH_PATH {
			respond(200, r#"{"data":{"token":"A2"}}"#, None)
		} else {
			respond(401, "expired", None)
		}
	});
	let (client, _, hooks) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let err = client
		.execute(ApiRequest::get("/items"))
		.await
		.expect_err("Malformed refresh bodies should fail the request.");

	match err {
		Error::Decode { source, status } => {
			assert_eq!(status, 200);
			assert_eq!(source.path().to_string(), "data");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(hooks.notices(), vec![Notice::session_expired(None)]);
	assert!(client.tokens().access_token().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_refresh_leader_aborts_the_cycle() {
	let transport = rotating_server(user_access("A2"), refresh_token("R2"));
	let gate = transport.gate(REFRESH_PATH);
	let (client, _, _) = build_client(transport);

	seed(&client, &user_access("A1"), &refresh_token("R1"));

	let leader = {
		let client = client.clone();

		tokio::spawn(async move { client.execute(ApiRequest::get("/leader")).await })
	};

	gate.arrival().await;

	let follower = {
		let client = client.clone();

		tokio::spawn(async move { client.execute(ApiRequest::get("/follower")).await })
	};

	eventually(|| client.queued_requests().len() == 2).await;
	leader.abort();

	let err = follower
		.await
		.expect("Follower task should not panic.")
		.expect_err("Aborting the leader should reject the queue.");

	assert!(matches!(err, Error::RefreshAborted));
	assert!(!client.is_refreshing());
	assert_eq!(client.refresh_metrics().failures(), 1);
}
