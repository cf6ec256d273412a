//! Wire encoding tests through the public API.

use pretty_assertions::assert_eq;
use synapse_reader::config::ConnectionConfig;
use synapse_reader::wire::{
    build_connection_string, decode_token, encode_token, raw_connection_string,
};
use url::form_urlencoded;

#[test]
fn test_token_round_trip_for_ascii_tokens() {
    let tokens = [
        "",
        "a",
        "eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9.eyJhdWQiOiJodHRwczovL2RhdGFiYXNlLndpbmRvd3MubmV0LyJ9.Zm9v",
        "with spaces and ~!@#$%^&*()",
    ];

    for token in tokens {
        let encoded = encode_token(token).unwrap();
        let bytes = encoded.as_bytes();
        let prefix = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        assert_eq!(prefix as usize, 2 * token.len());
        assert_eq!(bytes.len(), 4 + 2 * token.len());
        assert_eq!(decode_token(bytes).unwrap(), token);
    }
}

#[test]
fn test_connection_string_embeds_in_url() {
    let config = ConnectionConfig::new("myws.sql.azuresynapse.net", "sales dw");
    let encoded = build_connection_string(&config);

    let url = url::Url::parse(&format!("mssql+pyodbc:///?odbc_connect={encoded}")).unwrap();
    let (key, value) = url.query_pairs().next().unwrap();

    assert_eq!(key, "odbc_connect");
    assert_eq!(value, raw_connection_string(&config));
    assert!(value.contains("Server=tcp:myws.sql.azuresynapse.net,1433;"));
    assert!(value.contains("Database=sales dw;"));
}

#[test]
fn test_connection_string_stable_for_equal_configs() {
    let a = ConnectionConfig::new("host", "db");
    let b = ConnectionConfig::new("host", "db");
    assert_eq!(build_connection_string(&a), build_connection_string(&b));

    let decoded: String = form_urlencoded::parse(format!("k={}", build_connection_string(&a)).as_bytes())
        .map(|(_, v)| v.into_owned())
        .collect();
    assert_eq!(decoded, raw_connection_string(&a));
}
