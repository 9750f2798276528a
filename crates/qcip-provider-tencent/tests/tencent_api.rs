//! Contract Test: Tencent Cloud API Adapters
//!
//! Constraints verified:
//! - Requests carry the TC3 signature and the X-TC-* headers
//! - Fetch payloads and write payloads have the documented shape
//! - A fetch → update cycle only changes the reconciled address
//! - API errors surface as provider errors with the API's code

use qcip_core::error::Error;
use qcip_core::reconcile;
use qcip_core::traits::FirewallProvider;
use qcip_core::Credentials;
use qcip_provider_tencent::{LighthouseProvider, SecurityGroupProvider};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials::new("AKIDtest", "secret")
}

async fn lighthouse(server: &MockServer) -> LighthouseProvider {
    LighthouseProvider::new(credentials(), "ap-guangzhou", "lhins-1")
        .unwrap()
        .with_endpoint(&server.uri())
        .unwrap()
}

async fn security_group(server: &MockServer) -> SecurityGroupProvider {
    SecurityGroupProvider::new(credentials(), "ap-shanghai", "sg-1")
        .unwrap()
        .with_endpoint(&server.uri())
        .unwrap()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn lighthouse_fetch_is_signed_and_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-tc-action", "DescribeFirewallRules"))
        .and(header("x-tc-version", "2020-03-24"))
        .and(header("x-tc-region", "ap-guangzhou"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(header_regex(
            "authorization",
            r"^TC3-HMAC-SHA256 Credential=AKIDtest/\d{4}-\d{2}-\d{2}/lighthouse/tc3_request, SignedHeaders=content-type;host;x-tc-action, Signature=[0-9a-f]{64}$",
        ))
        .and(body_json(json!({"InstanceId": "lhins-1", "Offset": 0, "Limit": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "TotalCount": 2,
                "FirewallRuleSet": [
                    {"AppType": "Linux login", "Protocol": "TCP", "Port": "22",
                     "CidrBlock": "0.0.0.0/0", "Ipv6CidrBlock": "", "Action": "ACCEPT",
                     "FirewallRuleDescription": "ssh"},
                    {"AppType": "Custom", "Protocol": "TCP", "Port": "3306",
                     "CidrBlock": "1.2.3.4", "Ipv6CidrBlock": "", "Action": "ACCEPT",
                     "FirewallRuleDescription": "home-ip"}
                ],
                "RequestId": "req-1"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rules = lighthouse(&server).await.fetch_rules().await.unwrap();

    assert_eq!(rules.len(), 2);
    assert_eq!(rules.rules[1].description, "home-ip");
    assert_eq!(rules.rules[1].address, "1.2.3.4");
    assert_eq!(rules.version, None);
}

#[tokio::test]
async fn lighthouse_update_sends_every_rule() {
    let server = MockServer::start().await;
    Mock::given(header("x-tc-action", "DescribeFirewallRules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "TotalCount": 2,
                "FirewallRuleSet": [
                    {"AppType": "Linux login", "Protocol": "TCP", "Port": "22",
                     "CidrBlock": "0.0.0.0/0", "Ipv6CidrBlock": "", "Action": "ACCEPT",
                     "FirewallRuleDescription": "ssh"},
                    {"AppType": "Custom", "Protocol": "ICMP", "Port": "",
                     "CidrBlock": "1.2.3.4", "Ipv6CidrBlock": "", "Action": "ACCEPT",
                     "FirewallRuleDescription": "home-ip"}
                ],
                "RequestId": "req-1"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(header("x-tc-action", "ModifyFirewallRules"))
        .and(body_json(json!({
            "InstanceId": "lhins-1",
            "FirewallRules": [
                {"Protocol": "TCP", "Port": "22", "CidrBlock": "0.0.0.0/0",
                 "Action": "ACCEPT", "FirewallRuleDescription": "ssh"},
                {"Protocol": "ICMP", "CidrBlock": "5.6.7.8",
                 "Action": "ACCEPT", "FirewallRuleDescription": "home-ip"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Response": {"RequestId": "req-2"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = lighthouse(&server).await;
    let fetched = provider.fetch_rules().await.unwrap();
    let result = reconcile(fetched, "5.6.7.8", &tags(&["home-ip"]));
    assert!(result.changed());

    provider.update_rules(result.rules).await.unwrap();
}

#[tokio::test]
async fn security_group_round_trip_keeps_version_and_drops_egress() {
    let server = MockServer::start().await;
    Mock::given(header("x-tc-action", "DescribeSecurityGroupPolicies"))
        .and(header("x-tc-version", "2017-03-12"))
        .and(header("x-tc-region", "ap-shanghai"))
        .and(body_json(json!({"SecurityGroupId": "sg-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "SecurityGroupPolicySet": {
                    "Version": "7",
                    "Ingress": [{
                        "PolicyIndex": 0, "Protocol": "TCP", "Port": "22",
                        "ServiceTemplate": {"ServiceId": "", "ServiceGroupId": ""},
                        "CidrBlock": "1.2.3.4", "Ipv6CidrBlock": "", "SecurityGroupId": "sg-1",
                        "AddressTemplate": {"AddressId": "", "AddressGroupId": ""},
                        "Action": "ACCEPT", "PolicyDescription": "home-ip", "ModifyTime": ""
                    }],
                    "Egress": [{
                        "PolicyIndex": 0, "Protocol": "ALL", "Port": "ALL",
                        "CidrBlock": "0.0.0.0/0", "Action": "ACCEPT", "PolicyDescription": ""
                    }]
                },
                "RequestId": "req-3"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(header("x-tc-action", "ModifySecurityGroupPolicies"))
        .and(header_regex("authorization", r"/vpc/tc3_request, "))
        .and(body_json(json!({
            "SecurityGroupId": "sg-1",
            "SecurityGroupPolicySet": {
                "Version": "7",
                "Ingress": [{
                    "Protocol": "TCP", "Port": "22", "ServiceTemplate": {},
                    "CidrBlock": "5.6.7.8", "Action": "ACCEPT", "PolicyDescription": "home-ip"
                }]
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Response": {"RequestId": "req-4"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = security_group(&server).await;
    let fetched = provider.fetch_rules().await.unwrap();
    assert_eq!(fetched.version.as_deref(), Some("7"));
    assert_eq!(fetched.len(), 1, "only ingress policies are managed");

    let result = reconcile(fetched, "5.6.7.8", &tags(&["home-ip"]));
    provider.update_rules(result.rules).await.unwrap();
}

#[tokio::test]
async fn api_error_becomes_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": {
                "Error": {
                    "Code": "AuthFailure.SecretIdNotFound",
                    "Message": "The SecretId is not found"
                },
                "RequestId": "req-5"
            }
        })))
        .mount(&server)
        .await;

    let err = lighthouse(&server).await.fetch_rules().await.unwrap_err();

    match err {
        Error::ProviderApi {
            provider,
            code,
            message,
        } => {
            assert_eq!(provider, "lighthouse");
            assert_eq!(code, "AuthFailure.SecretIdNotFound");
            assert_eq!(message, "The SecretId is not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = security_group(&server).await.fetch_rules().await.unwrap_err();

    assert!(matches!(err, Error::ProviderApi { ref code, .. } if code == "HTTP 502"));
}

#[tokio::test]
async fn missing_response_object_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = lighthouse(&server).await.fetch_rules().await.unwrap_err();

    assert!(matches!(err, Error::InvalidResponse(_)));
}
