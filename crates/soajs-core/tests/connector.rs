//! 服务解析：网格直连、网关兜底与 controller 路径。

use proptest::prelude::*;
use serde_json::{Value, json};
use soajs_core::connector::gateway_path;
use soajs_core::{ConnectionRoute, INJECT_HEADER, KEY_HEADER, RequestContext, ServiceConnector};

fn context() -> RequestContext {
    let header = json!({
        "tenant": { "id": "t1", "code": "TNT1" },
        "key": { "iKey": "ik", "eKey": "ek-123", "config": { "orders": { "limit": 5 } } },
        "application": { "product": "PROD", "package": "PROD_BASIC" },
        "package": { "acl": { "orders": { "access": true } }, "acl_all_env": { "dev": {} } },
        "awareness": {
            "host": "gateway.local",
            "port": 4000,
            "interConnect": [
                { "name": "payments", "version": "1", "latest": "2", "host": "10.0.0.4", "port": 4011 },
                { "name": "payments", "version": "2", "latest": "2", "host": "10.0.0.5", "port": 4012 },
                { "name": "auth", "version": "1", "host": "10.0.0.6", "port": 4020 }
            ]
        },
        "device": "mobile",
        "geo": { "ip": "1.2.3.4" }
    });
    RequestContext::from_header_value(&header.to_string()).expect("样例头部应可解析")
}

#[test]
fn mesh_hit_on_latest_forwards_full_context() {
    let ctx = context();
    let descriptor = ServiceConnector::new(&ctx).connect("payments", None);

    assert_eq!(descriptor.route, ConnectionRoute::Mesh);
    assert_eq!(descriptor.host, "10.0.0.5:4012");
    assert_eq!(descriptor.headers.len(), 1);

    let payload: Value = serde_json::from_str(&descriptor.headers[INJECT_HEADER]).unwrap();
    assert_eq!(payload["tenant"]["code"], json!("TNT1"));
    assert_eq!(payload["key"]["iKey"], json!("ik"));
    assert_eq!(payload["key"]["eKey"], json!("ek-123"));
    assert_eq!(payload["key"]["config"]["orders"]["limit"], json!(5));
    assert_eq!(payload["application"]["product"], json!("PROD"));
    assert_eq!(payload["package"]["acl"]["orders"]["access"], json!(true));
    assert_eq!(payload["package"]["acl_all_env"], json!({ "dev": {} }));
    assert_eq!(payload["device"], json!("mobile"));
    assert_eq!(payload["geo"]["ip"], json!("1.2.3.4"));
    assert_eq!(payload["urac"], Value::Null);
    assert_eq!(payload["awareness"]["interConnect"].as_array().unwrap().len(), 3);
}

#[test]
fn forwarded_payload_parses_back_into_same_context() {
    let ctx = context();
    let descriptor = ServiceConnector::new(&ctx).connect("payments", Some("1"));
    assert_eq!(descriptor.host, "10.0.0.4:4011");

    let relayed = RequestContext::from_header_value(&descriptor.headers[INJECT_HEADER]).unwrap();
    assert_eq!(relayed, ctx);
}

#[test]
fn entry_without_latest_only_matches_explicit_version() {
    let ctx = context();
    let connector = ServiceConnector::new(&ctx);

    let fallback = connector.connect("auth", None);
    assert_eq!(fallback.route, ConnectionRoute::Gateway);
    assert_eq!(fallback.host, "gateway.local:4000/");
    assert_eq!(fallback.headers[KEY_HEADER], "ek-123");
    assert_eq!(fallback.headers.len(), 1);

    assert!(connector.connect("auth", Some("1")).is_mesh());
}

#[test]
fn unknown_service_or_version_falls_back_to_gateway() {
    let ctx = context();
    let connector = ServiceConnector::new(&ctx);
    assert_eq!(connector.connect("billing", None).host, "gateway.local:4000/");
    assert!(!connector.connect("payments", Some("3")).is_mesh());
}

#[test]
fn controller_paths() {
    let ctx = context();
    let connector = ServiceConnector::new(&ctx);
    assert_eq!(
        connector.connect("controller", Some("3")).host,
        "gateway.local:4000/controller/v3/"
    );
    assert_eq!(
        connector.connect("controller", Some("beta")).host,
        "gateway.local:4000/controller/"
    );
}

#[test]
fn missing_external_key_sends_empty_key_header() {
    let mut ctx = context();
    ctx.tenant.key.external = None;
    let descriptor = ServiceConnector::new(&ctx).connect("billing", None);
    assert_eq!(descriptor.headers[KEY_HEADER], "");
}

proptest! {
    #[test]
    fn non_controller_gateway_path_is_bare_authority(
        service in "[a-z][a-z0-9-]{0,15}",
        version in proptest::option::of("[0-9a-z.]{0,4}"),
        port in 1u16..,
    ) {
        prop_assume!(!service.eq_ignore_ascii_case("controller"));
        prop_assert_eq!(
            gateway_path("gw", port, &service, version.as_deref()),
            format!("gw:{port}/")
        );
    }

    #[test]
    fn controller_version_suffix_only_for_digits(version in "[0-9a-z]{1,4}") {
        let path = gateway_path("gw", 4000, "controller", Some(&version));
        if version.bytes().all(|b| b.is_ascii_digit()) {
            prop_assert_eq!(path, format!("gw:4000/controller/v{version}/"));
        } else {
            prop_assert_eq!(path, "gw:4000/controller/".to_owned());
        }
    }
}
