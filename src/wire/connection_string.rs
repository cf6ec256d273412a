//! ODBC connection string construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::ConnectionConfig;

/// Bytes left as-is: alphanumerics, `_.-~`, and space (which becomes `+`).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

/// SQL Server listens on a fixed port for Synapse endpoints.
pub const SQL_SERVER_PORT: u16 = 1433;

/// Formats the unescaped ODBC connection string.
///
/// Useful for display; use [`build_connection_string`] for embedding in a URL.
pub fn raw_connection_string(config: &ConnectionConfig) -> String {
    format!(
        "Driver={};Server=tcp:{},{};Database={};TrustServerCertificate=no;Connection Timeout={};autocommit=True;",
        config.driver, config.server, SQL_SERVER_PORT, config.database, config.timeout
    )
}

/// Builds the connection string percent-encoded for use as a query parameter.
///
/// Spaces become `+`; everything except alphanumerics and `_.-~` is `%XX`
/// escaped, so a literal `+` is always `%2B`.
pub fn build_connection_string(config: &ConnectionConfig) -> String {
    utf8_percent_encode(&raw_connection_string(config), QUERY_VALUE)
        .to_string()
        .replace(' ', "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use url::form_urlencoded;

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            server: "testserver".to_string(),
            database: "testdb".to_string(),
            driver: "ODBC Driver 18".to_string(),
            access_token_attr: 1234,
            timeout: 30,
        }
    }

    #[test]
    fn test_raw_connection_string() {
        assert_eq!(
            raw_connection_string(&test_config()),
            "Driver=ODBC Driver 18;Server=tcp:testserver,1433;Database=testdb;\
             TrustServerCertificate=no;Connection Timeout=30;autocommit=True;"
        );
    }

    #[test]
    fn test_connection_string_is_encoded() {
        let encoded = build_connection_string(&test_config());
        assert_eq!(
            encoded,
            "Driver%3DODBC+Driver+18%3BServer%3Dtcp%3Atestserver%2C1433%3BDatabase%3Dtestdb%3B\
             TrustServerCertificate%3Dno%3BConnection+Timeout%3D30%3Bautocommit%3DTrue%3B"
        );
    }

    #[test]
    fn test_connection_string_decodes_to_raw() {
        let config = test_config();
        let encoded = build_connection_string(&config);
        let decoded: String = form_urlencoded::parse(format!("x={encoded}").as_bytes())
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(decoded, raw_connection_string(&config));
        assert!(decoded.contains("Database=testdb"));
    }

    #[test]
    fn test_connection_string_is_deterministic() {
        let config = test_config();
        assert_eq!(
            build_connection_string(&config),
            build_connection_string(&config.clone())
        );
    }

    #[test]
    fn test_braces_in_driver_name_are_escaped() {
        let mut config = test_config();
        config.driver = "{ODBC Driver 18 for SQL Server}".to_string();
        let encoded = build_connection_string(&config);
        assert!(encoded.starts_with("Driver%3D%7BODBC+Driver+18+for+SQL+Server%7D%3B"));
    }

    #[test]
    fn test_tilde_kept_and_star_escaped() {
        let mut config = test_config();
        config.database = "db~x*y+z".to_string();
        let encoded = build_connection_string(&config);
        assert!(encoded.contains("Database%3Ddb~x%2Ay%2Bz%3B"));
    }
}
