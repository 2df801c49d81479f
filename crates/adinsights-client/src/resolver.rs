//! Typed access to the upstream endpoints.
//!
//! Every response shape is checked here, once; callers only ever see
//! `Platform`, `Account`, `FieldSet` and `Insight` values.

use adinsights_core::{
    Account, AccountId, AdInsightsError, FieldSet, Insight, Platform, PlatformId, Result,
    UpstreamFetch,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::form_urlencoded::byte_serialize;

#[derive(Clone)]
pub struct Resolver {
    upstream: Arc<dyn UpstreamFetch>,
}

impl Resolver {
    pub fn new(upstream: Arc<dyn UpstreamFetch>) -> Self {
        Self { upstream }
    }

    /// `/platforms` exactly as upstream returned it.
    pub async fn raw_platforms(&self) -> Result<Value> {
        self.upstream.fetch("/platforms").await
    }

    pub async fn list_platforms(&self) -> Result<Vec<Platform>> {
        parse_platforms(self.raw_platforms().await?)
    }

    /// Flat platform id list; the one enumeration helper every route uses.
    pub async fn list_platform_ids(&self) -> Result<Vec<PlatformId>> {
        Ok(self
            .list_platforms()
            .await?
            .into_iter()
            .map(|platform| platform.id)
            .collect())
    }

    /// Look `name` up among the current platforms.
    ///
    /// Unknown names fail with `Validation`, carrying the full valid list.
    pub async fn require_platform(&self, name: &str) -> Result<Platform> {
        let platforms = self.list_platforms().await?;
        let ids: Vec<PlatformId> = platforms.iter().map(|p| p.id.clone()).collect();
        if !validate_platform(name, &ids) {
            return Err(AdInsightsError::Validation {
                requested: name.to_string(),
                available: ids.into_iter().map(|id| id.to_string()).collect(),
            });
        }
        platforms
            .into_iter()
            .find(|p| p.id == *name)
            .ok_or_else(|| AdInsightsError::structural("platform disappeared during lookup"))
    }

    pub async fn list_accounts(&self, platform: &PlatformId) -> Result<Vec<Account>> {
        let body = self
            .upstream
            .fetch(&format!("/accounts?platform={}", encode(platform.as_str())))
            .await?;
        parse_accounts(body)
    }

    pub async fn list_fields(&self, platform: &PlatformId) -> Result<FieldSet> {
        let body = self
            .upstream
            .fetch(&format!("/fields?platform={}", encode(platform.as_str())))
            .await?;
        parse_fields(body)
    }

    pub async fn fetch_insights(
        &self,
        platform: &PlatformId,
        account: &AccountId,
        fields: &FieldSet,
    ) -> Result<Vec<Insight>> {
        let body = self
            .upstream
            .fetch(&insights_endpoint(platform, account, fields))
            .await?;
        parse_insights(body)
    }
}

/// Membership check of `name` against a known platform list.
pub fn validate_platform(name: &str, known: &[PlatformId]) -> bool {
    known.iter().any(|id| id == name)
}

fn encode(component: &str) -> String {
    byte_serialize(component.as_bytes()).collect()
}

fn insights_endpoint(platform: &PlatformId, account: &AccountId, fields: &FieldSet) -> String {
    // Field names are encoded one by one; the separating commas stay literal.
    let fields = fields.iter().map(encode).collect::<Vec<_>>().join(",");
    format!(
        "/insights?platform={}&account={}&fields={}",
        encode(platform.as_str()),
        encode(account.as_str()),
        fields
    )
}

fn parse_platforms(body: Value) -> Result<Vec<Platform>> {
    let Value::Object(mut body) = body else {
        return Err(AdInsightsError::structural(
            "unexpected structure in platforms response",
        ));
    };

    let entries = match body.remove("platforms") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(AdInsightsError::structural(
                "platforms in response is not a list",
            ))
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.get("value").and_then(Value::as_str);
            if id.is_none() {
                debug!(entry = %entry, "skipping platform descriptor without value");
            }
            id.map(|id| Platform {
                id: PlatformId::from(id),
                label: entry
                    .get("label")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect())
}

fn parse_accounts(body: Value) -> Result<Vec<Account>> {
    let Value::Object(mut body) = body else {
        return Err(AdInsightsError::structural(
            "unexpected structure in accounts response",
        ));
    };

    let entries = match body.remove("accounts") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => {
            return Err(AdInsightsError::structural(
                "could not find accounts in response",
            ))
        }
    };

    Ok(entries
        .iter()
        .filter_map(|entry| {
            if !entry.is_object() {
                warn!(account = %entry, "account entry is not an object, skipping");
                return None;
            }
            match Account::deserialize(entry) {
                Ok(account) => Some(account),
                Err(e) => {
                    warn!(account = %entry, error = %e, "account entry has no usable id, skipping");
                    None
                }
            }
        })
        .collect())
}

fn parse_fields(body: Value) -> Result<FieldSet> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut body) => match body.remove("fields") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(AdInsightsError::structural(
                    "could not find fields in response",
                ))
            }
        },
        _ => {
            return Err(AdInsightsError::structural(
                "unexpected structure in fields response",
            ))
        }
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(name) => Ok(name),
            Value::Object(ref descriptor) => descriptor
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    AdInsightsError::structural(format!("unexpected field entry: {}", entry))
                }),
            other => Err(AdInsightsError::structural(format!(
                "unexpected field entry: {}",
                other
            ))),
        })
        .collect()
}

fn parse_insights(body: Value) -> Result<Vec<Insight>> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut body) => match body.remove("insights") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(AdInsightsError::structural(
                    "could not find insights in response",
                ))
            }
        },
        _ => {
            return Err(AdInsightsError::structural(
                "unexpected structure in insights response",
            ))
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(values) => Some(Insight::new(values)),
            other => {
                debug!(entry = %other, "skipping non-object insight");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubUpstream;
    use adinsights_core::Metric;
    use serde_json::json;

    fn resolver(stub: StubUpstream) -> (Resolver, Arc<StubUpstream>) {
        let stub = Arc::new(stub);
        (Resolver::new(stub.clone()), stub)
    }

    #[test]
    fn platforms_are_flattened_to_values() {
        let platforms = parse_platforms(json!({
            "platforms": [
                {"value": "meta", "label": "Facebook"},
                {"label": "no value"},
                {"value": "ga4"}
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = platforms.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["meta", "ga4"]);
        assert_eq!(platforms[0].label.as_deref(), Some("Facebook"));
        assert_eq!(platforms[1].label, None);
    }

    #[test]
    fn platforms_without_key_is_empty_but_list_body_is_structural() {
        assert!(parse_platforms(json!({})).unwrap().is_empty());
        assert!(matches!(
            parse_platforms(json!(["meta"])),
            Err(AdInsightsError::Structural(_))
        ));
    }

    #[test]
    fn accounts_require_non_empty_list() {
        for body in [json!({}), json!({"accounts": []}), json!({"accounts": "x"})] {
            let err = parse_accounts(body).unwrap_err();
            assert_eq!(err.to_string(), "could not find accounts in response");
        }
        let err = parse_accounts(json!([{"id": 1}])).unwrap_err();
        assert_eq!(err.to_string(), "unexpected structure in accounts response");
    }

    #[test]
    fn accounts_without_id_are_skipped() {
        let accounts = parse_accounts(json!({
            "accounts": [
                {"id": 1, "name": "Acc1"},
                {"name": "orphan"},
                "not an object",
                {"id": "act_2", "name": "Acc2", "extra": true}
            ]
        }))
        .unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id.as_str(), "1");
        assert_eq!(accounts[1].name, "Acc2");
    }

    #[test]
    fn fields_accept_strings_and_descriptors() {
        let plain = parse_fields(json!(["clicks", "spend"])).unwrap();
        assert_eq!(plain.as_slice(), ["clicks", "spend"]);

        let wrapped = parse_fields(json!({"fields": [{"value": "ctr", "text": "CTR"}, "cpc"]}))
            .unwrap();
        assert_eq!(wrapped.as_slice(), ["ctr", "cpc"]);

        assert!(parse_fields(json!([1, 2])).is_err());
        assert!(parse_fields(json!("clicks")).is_err());
    }

    #[test]
    fn insights_skip_non_objects() {
        let insights = parse_insights(json!([{"clicks": 1}, 7, {"clicks": 2.5}])).unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[1].metric("clicks"), Some(Metric::Float(2.5)));

        let wrapped = parse_insights(json!({"insights": [{"clicks": 3}]})).unwrap();
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn insights_endpoint_keeps_commas_literal() {
        let fields: FieldSet = ["clicks", "cost per click"].into_iter().collect();
        let endpoint = insights_endpoint(
            &PlatformId::from("meta"),
            &AccountId::new("a&b"),
            &fields,
        );
        assert_eq!(
            endpoint,
            "/insights?platform=meta&account=a%26b&fields=clicks,cost+per+click"
        );
    }

    #[test]
    fn validate_platform_is_membership() {
        let known = vec![PlatformId::from("meta"), PlatformId::from("ga4")];
        assert!(validate_platform("meta", &known));
        assert!(!validate_platform("tiktok", &known));
        assert!(!validate_platform("", &[]));
    }

    #[tokio::test]
    async fn require_platform_reports_available_list() {
        let (resolver, _) = resolver(StubUpstream::new().with(
            "/platforms",
            json!({"platforms": [{"value": "meta", "label": "Meta"}, {"value": "ga4"}]}),
        ));

        let found = resolver.require_platform("meta").await.unwrap();
        assert_eq!(found.label.as_deref(), Some("Meta"));

        match resolver.require_platform("tiktok").await.unwrap_err() {
            AdInsightsError::Validation {
                requested,
                available,
            } => {
                assert_eq!(requested, "tiktok");
                assert_eq!(available, ["meta", "ga4"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let (resolver, stub) = resolver(StubUpstream::new().with_error(
            "/accounts?platform=meta",
            500,
            "boom",
        ));

        let err = resolver
            .list_accounts(&PlatformId::from("meta"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdInsightsError::UpstreamHttp { status: 500, .. }));
        assert_eq!(stub.calls(), ["/accounts?platform=meta"]);
    }
}
