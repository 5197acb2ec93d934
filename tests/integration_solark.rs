//! Integration tests for the Sol-Ark Cloud client.
use rstest::{fixture, rstest};
use solarkbridge::integration::solark::{
    AuthMode, Client, Credentials, Error, Host, ProtocolHint, normalize,
};
use std::time::Duration;

use crate::mockserver_solark::SolarkMockServer;


fn client_with_mode(server: &SolarkMockServer, auth_mode: AuthMode) -> Client {
    let credentials = Credentials {
        email: server.email(),
        password: server.password(),
        plant_id: server.plant_id(),
        auth_mode,
    };
    Client::new(
        credentials,
        server.url(),
        server.url(),
        Duration::from_secs(5),
    )
}

#[fixture]
/// Combined fixture yielding a client in auto mode and its mock server
async fn client_server() -> (Client, SolarkMockServer) {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = SolarkMockServer::start().await;
    let client = client_with_mode(&server, AuthMode::Auto);
    (client, server)
}

#[rstest]
#[tokio::test]
async fn test_login_modern(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    let mock = server.mock_oauth_login_ok().await;

    let result = client.login(Host::Primary).await;

    mock.assert_async().await;
    assert!(result.is_ok());
}

#[rstest]
#[tokio::test]
async fn test_login_reuses_session(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    let mock = server.mock_oauth_login_ok().await;

    client.login(Host::Primary).await.expect("login failed");
    client.login(Host::Primary).await.expect("login failed");

    assert_eq!(mock.hits_async().await, 1, "session should be reused");
}

#[rstest]
#[tokio::test]
async fn test_auto_falls_back_to_legacy(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    let modern = server.mock_oauth_login_not_found().await;
    let legacy = server.mock_legacy_login_ok().await;

    let result = client.login(Host::Primary).await;

    assert!(result.is_ok());
    assert_eq!(modern.hits_async().await, 1);
    legacy.assert_async().await;

    // The legacy protocol is learned; a later login skips the modern endpoint
    client.logout().await;
    client.login(Host::Primary).await.expect("login failed");
    assert_eq!(modern.hits_async().await, 1, "modern should not be retried");
    assert_eq!(legacy.hits_async().await, 2);
}

#[tokio::test]
async fn test_strict_mode_never_falls_back() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = SolarkMockServer::start().await;
    let client = client_with_mode(&server, AuthMode::Strict);
    let modern = server.mock_oauth_login_not_found().await;
    let legacy = server.mock_legacy_login_ok().await;

    let result = client.login(Host::Primary).await;

    assert!(matches!(result, Err(Error::AuthFailed(_))));
    assert_eq!(modern.hits_async().await, 1);
    assert_eq!(legacy.hits_async().await, 0);
}

#[tokio::test]
async fn test_legacy_mode_skips_modern() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = SolarkMockServer::start().await;
    let client = client_with_mode(&server, AuthMode::Legacy);
    let modern = server.mock_oauth_login_ok().await;
    let legacy = server.mock_legacy_login_ok().await;

    let result = client.login(Host::Primary).await;

    assert!(result.is_ok());
    assert_eq!(modern.hits_async().await, 0);
    legacy.assert_async().await;
}

#[rstest]
#[tokio::test]
async fn test_login_with_wrong_credentials(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    let mock = server.mock_oauth_login_unauthorized().await;

    let result = client.login(Host::Primary).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(Error::InvalidCredentials)));
}

#[rstest]
#[tokio::test]
async fn test_fetch_plant_data_classic(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let (mock, expected_pv) = server.mock_plant_data_classic().await;

    let raw = client
        .fetch_plant_data(Host::Primary)
        .await
        .expect("failed to fetch plant data");

    mock.assert_async().await;
    let hint = ProtocolHint::detect(&raw);
    assert_eq!(hint, ProtocolHint::Classic);
    let snapshot = normalize(&raw, hint);
    assert_eq!(snapshot.pv_power, Some(expected_pv));
    assert_eq!(snapshot.load_power, Some(820.0));
    assert_eq!(snapshot.grid_power, Some(-300.0));
    assert_eq!(snapshot.battery_power, Some(410.0));
    assert_eq!(snapshot.battery_soc, Some(87.5));
    assert_eq!(snapshot.energy_today, Some(12.3));
    assert_eq!(snapshot.energy_total, Some(1050.0));
}

#[rstest]
#[tokio::test]
async fn test_fetch_plant_data_strog(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_strog().await;

    let raw = client
        .fetch_plant_data(Host::Primary)
        .await
        .expect("failed to fetch plant data");

    mock.assert_async().await;
    let hint = ProtocolHint::detect(&raw);
    assert_eq!(hint, ProtocolHint::Strog);
    let snapshot = normalize(&raw, hint);
    assert_eq!(snapshot.pv_power, Some(2330.0));
    assert_eq!(snapshot.grid_power, Some(300.0));
    assert_eq!(snapshot.battery_power, Some(-520.0));
    assert_eq!(snapshot.battery_soc, Some(75.0));
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_legacy_session(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_not_found().await;
    server.mock_legacy_login_ok().await;
    let mock = server.mock_plant_data_classic_legacy_token().await;

    let raw = client
        .fetch_plant_data(Host::Primary)
        .await
        .expect("failed to fetch plant data");

    mock.assert_async().await;
    assert_eq!(raw.f64("pac"), Some(900.0));
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_rejected_session(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    let login = server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_unauthorized().await;

    let result = client.fetch_plant_data(Host::Primary).await;

    assert_eq!(mock.hits_async().await, 1, "should not retry on 401");
    assert!(matches!(result, Err(Error::TokenExpired)));

    // The session was invalidated; the next fetch logs in again
    let _ = client.fetch_plant_data(Host::Primary).await;
    assert_eq!(login.hits_async().await, 2);
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_rate_limiting(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_rate_limited().await;

    let result = client.fetch_plant_data(Host::Primary).await;

    assert_eq!(mock.hits_async().await, 1, "should not retry on 429");
    assert!(matches!(result, Err(Error::RateLimited)));
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_server_error(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_server_error().await;

    let result = client.fetch_plant_data(Host::Primary).await;

    assert!(
        mock.hits_async().await > 1,
        "should retry on server error"
    );
    assert!(matches!(result, Err(Error::ServerError(500))));
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_unknown_plant(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_not_found().await;

    let result = client.fetch_plant_data(Host::Primary).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(Error::InvalidPlantId(id)) if id == server.plant_id()));
}

#[rstest]
#[tokio::test]
async fn test_fetch_with_vendor_envelope_error(
    #[future] client_server: (Client, SolarkMockServer),
) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let mock = server.mock_plant_data_envelope_error().await;

    let result = client.fetch_plant_data(Host::Primary).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(Error::Api(msg)) if msg == "plant offline"));
}

#[tokio::test]
async fn test_fetch_with_timeout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = SolarkMockServer::start().await;
    let credentials = Credentials {
        email: server.email(),
        password: server.password(),
        plant_id: server.plant_id(),
        auth_mode: AuthMode::Auto,
    };
    let client = Client::new(
        credentials,
        server.url(),
        server.url(),
        Duration::from_millis(250),
    );
    server.mock_oauth_login_ok().await;
    server
        .mock_plant_data_delayed(Duration::from_millis(500))
        .await;

    let result = client.fetch_plant_data(Host::Primary).await;

    assert!(matches!(result, Err(Error::Timeout)));
}

#[rstest]
#[tokio::test]
async fn test_test_connection(#[future] client_server: (Client, SolarkMockServer)) {
    let (client, server) = client_server.await;
    server.mock_oauth_login_ok().await;
    let (mock, _) = server.mock_plant_data_classic().await;

    assert!(client.test_connection(Host::Primary).await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_test_connection_failure() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = SolarkMockServer::start().await;
    let client = client_with_mode(&server, AuthMode::Auto);
    server.mock_oauth_login_unauthorized().await;

    assert!(!client.test_connection(Host::Primary).await);
}
