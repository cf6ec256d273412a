//! Configuration loading tests.

use std::io::Write;
use std::time::Duration;

use synapse_reader::config::Config;
use synapse_reader::ReaderError;

#[test]
fn test_load_full_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[auth]
tenant_id = "contoso"
client_id = "00000000-0000-0000-0000-000000000001"

[warehouses.default]
server = "myws.sql.azuresynapse.net"
database = "dw"

[retry]
max_attempts = 3
sleep_secs = 0.25
retry_on_zero = true
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let warehouse = config.resolve_warehouse(None).unwrap();
    let policy = config.retry.to_policy().unwrap();

    assert_eq!(warehouse.server, "myws.sql.azuresynapse.net");
    assert_eq!(warehouse.access_token_attr, 1256);
    assert_eq!(policy.max_attempts(), 3);
    assert_eq!(policy.sleep(), Duration::from_millis(250));
    assert!(policy.retry_on_zero());
    assert_eq!(
        config.auth.authority_url().unwrap(),
        "https://login.microsoftonline.com/contoso"
    );
}

#[test]
fn test_invalid_warehouse_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[warehouses.default]
server = ""
database = "dw"
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let err = config.resolve_warehouse(None).unwrap_err();
    assert!(matches!(err, ReaderError::Config(_)));
    assert!(err.to_string().contains("server is required"));
}
