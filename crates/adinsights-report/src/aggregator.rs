use adinsights_client::Resolver;
use adinsights_core::{Account, FieldSet, Insight, Metric, PlatformId, Result};
use tracing::warn;

/// What to do when one sub-fetch of a report fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Abort the whole report with the first error.
    FailFast,
    /// Log, drop the failing account or platform, keep going.
    BestEffort,
}

impl AggregationPolicy {
    /// Apply the policy to one sub-fetch outcome.
    ///
    /// `Ok(None)` means the caller should skip this item.
    pub fn settle<T>(
        self,
        result: Result<T>,
        context: impl FnOnce() -> String,
    ) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                let err = err.context(context());
                match self {
                    AggregationPolicy::FailFast => Err(err),
                    AggregationPolicy::BestEffort => {
                        warn!(error = %err, "skipping after upstream failure");
                        Ok(None)
                    }
                }
            }
        }
    }
}

/// Running per-field sums, kept in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    entries: Vec<(String, Metric)>,
}

impl Totals {
    pub fn zeroed<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entries: fields
                .into_iter()
                .map(|field| (field.to_string(), Metric::ZERO))
                .collect(),
        }
    }

    /// Add every numeric value of `insight` to its field total. Anything
    /// else (strings, bools, nulls, missing keys) counts as zero.
    pub fn add_insight(&mut self, insight: &Insight) {
        for (field, total) in &mut self.entries {
            if let Some(value) = insight.metric(field) {
                *total += value;
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<Metric> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, total)| *total)
    }

    pub fn values(&self) -> impl Iterator<Item = Metric> + '_ {
        self.entries.iter().map(|(_, total)| *total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Metric)> {
        self.entries
            .iter()
            .map(|(name, total)| (name.as_str(), *total))
    }
}

pub fn sum_insights(insights: &[Insight], fields: &FieldSet) -> Totals {
    let mut totals = Totals::zeroed(fields.iter());
    for insight in insights {
        totals.add_insight(insight);
    }
    totals
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountTotals {
    pub account: Account,
    pub totals: Totals,
}

/// Fetches insights and sums them, one account at a time.
pub struct InsightAggregator<'a> {
    resolver: &'a Resolver,
    policy: AggregationPolicy,
}

impl<'a> InsightAggregator<'a> {
    pub fn new(resolver: &'a Resolver, policy: AggregationPolicy) -> Self {
        Self { resolver, policy }
    }

    /// Insights of one account, or `None` when the fetch failed under
    /// `BestEffort`.
    pub async fn account_insights(
        &self,
        platform: &PlatformId,
        account: &Account,
        fields: &FieldSet,
    ) -> Result<Option<Vec<Insight>>> {
        let result = self
            .resolver
            .fetch_insights(platform, &account.id, fields)
            .await;
        self.policy.settle(result, || insights_context(account))
    }

    /// Totals for `fields` over every insight of one account. Errors always
    /// propagate here; the policy applies across accounts.
    pub async fn aggregate_account(
        &self,
        platform: &PlatformId,
        account: &Account,
        fields: &FieldSet,
    ) -> Result<Totals> {
        let insights = self
            .resolver
            .fetch_insights(platform, &account.id, fields)
            .await?;
        Ok(sum_insights(&insights, fields))
    }

    /// Per-account totals in account order. Accounts that fail under
    /// `BestEffort` are left out.
    pub async fn aggregate_accounts(
        &self,
        platform: &PlatformId,
        accounts: &[Account],
        fields: &FieldSet,
    ) -> Result<Vec<AccountTotals>> {
        let mut rows = Vec::with_capacity(accounts.len());
        for account in accounts {
            let result = self.aggregate_account(platform, account, fields).await;
            let settled = self.policy.settle(result, || insights_context(account))?;
            if let Some(totals) = settled {
                rows.push(AccountTotals {
                    account: account.clone(),
                    totals,
                });
            }
        }
        Ok(rows)
    }

    /// One set of totals over all accounts of a platform.
    ///
    /// Insights are requested with `fields` but summed over `columns`, which
    /// may be wider (the cross-platform column union).
    pub async fn aggregate_platform(
        &self,
        platform: &PlatformId,
        accounts: &[Account],
        fields: &FieldSet,
        columns: &[String],
    ) -> Result<Totals> {
        let mut totals = Totals::zeroed(columns.iter().map(String::as_str));
        for account in accounts {
            if let Some(insights) = self.account_insights(platform, account, fields).await? {
                for insight in &insights {
                    totals.add_insight(insight);
                }
            }
        }
        Ok(totals)
    }
}

fn insights_context(account: &Account) -> String {
    format!("Error retrieving insights for account {}", account.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adinsights_client::StubUpstream;
    use adinsights_core::{AccountId, AdInsightsError};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn insight(value: Value) -> Insight {
        Insight::new(value.as_object().cloned().unwrap())
    }

    fn account(id: &str, name: &str) -> Account {
        Account {
            id: AccountId::new(id),
            name: name.to_string(),
        }
    }

    #[test]
    fn sums_only_numeric_values() {
        let fields: FieldSet = ["a", "b"].into_iter().collect();
        let totals = sum_insights(
            &[insight(json!({"a": 1, "b": "x"})), insight(json!({"a": 2}))],
            &fields,
        );
        assert_eq!(totals.get("a"), Some(Metric::Int(3)));
        assert_eq!(totals.get("b"), Some(Metric::Int(0)));
        assert_eq!(totals.get("c"), None);
    }

    #[test]
    fn totals_keep_field_order() {
        let fields: FieldSet = ["spend", "clicks"].into_iter().collect();
        let totals = sum_insights(&[insight(json!({"clicks": 2, "spend": 1.5}))], &fields);
        let order: Vec<&str> = totals.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["spend", "clicks"]);
        assert_eq!(
            totals.values().collect::<Vec<_>>(),
            [Metric::Float(1.5), Metric::Int(2)]
        );
    }

    #[test]
    fn settle_follows_policy() {
        let failure = || -> Result<u8> { Err(AdInsightsError::structural("nope")) };

        let err = AggregationPolicy::FailFast
            .settle(failure(), || "Error retrieving accounts for meta".into())
            .unwrap_err();
        assert_eq!(err.to_string(), "Error retrieving accounts for meta: nope");

        let skipped = AggregationPolicy::BestEffort
            .settle(failure(), || "ignored".into())
            .unwrap();
        assert_eq!(skipped, None);

        assert_eq!(
            AggregationPolicy::FailFast
                .settle(Ok(7u8), || unreachable!())
                .unwrap(),
            Some(7)
        );
    }

    fn stub() -> StubUpstream {
        StubUpstream::new()
            .with(
                "/insights?platform=meta&account=1&fields=clicks,spend",
                json!([{"clicks": 10, "spend": 5.5}, {"clicks": 3, "spend": 1}]),
            )
            .with_error(
                "/insights?platform=meta&account=2&fields=clicks,spend",
                500,
                "upstream exploded",
            )
            .with(
                "/insights?platform=meta&account=3&fields=clicks,spend",
                json!([{"clicks": 1, "spend": "n/a"}]),
            )
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_failing_account() {
        let stub = Arc::new(stub());
        let resolver = Resolver::new(stub.clone());
        let aggregator = InsightAggregator::new(&resolver, AggregationPolicy::FailFast);
        let fields: FieldSet = ["clicks", "spend"].into_iter().collect();

        let err = aggregator
            .aggregate_accounts(
                &PlatformId::from("meta"),
                &[account("1", "A"), account("2", "B"), account("3", "C")],
                &fields,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error retrieving insights for account 2: HTTP error occurred: 500: upstream exploded"
        );
        // account 3 is never requested
        assert_eq!(stub.calls().len(), 2);
    }

    #[tokio::test]
    async fn best_effort_skips_failing_account() {
        let resolver = Resolver::new(Arc::new(stub()));
        let aggregator = InsightAggregator::new(&resolver, AggregationPolicy::BestEffort);
        let fields: FieldSet = ["clicks", "spend"].into_iter().collect();

        let rows = aggregator
            .aggregate_accounts(
                &PlatformId::from("meta"),
                &[account("1", "A"), account("2", "B"), account("3", "C")],
                &fields,
            )
            .await
            .unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.account.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(rows[0].totals.get("clicks"), Some(Metric::Int(13)));
        assert_eq!(rows[0].totals.get("spend"), Some(Metric::Float(6.5)));
        assert_eq!(rows[1].totals.get("spend"), Some(Metric::Int(0)));
    }

    #[tokio::test]
    async fn aggregate_platform_sums_over_wider_columns() {
        let resolver = Resolver::new(Arc::new(stub()));
        let aggregator = InsightAggregator::new(&resolver, AggregationPolicy::BestEffort);
        let fields: FieldSet = ["clicks", "spend"].into_iter().collect();
        let columns = vec!["clicks".to_string(), "impressions".to_string()];

        let totals = aggregator
            .aggregate_platform(
                &PlatformId::from("meta"),
                &[account("1", "A"), account("2", "B"), account("3", "C")],
                &fields,
                &columns,
            )
            .await
            .unwrap();

        assert_eq!(totals.get("clicks"), Some(Metric::Int(14)));
        assert_eq!(totals.get("impressions"), Some(Metric::Int(0)));
        assert_eq!(totals.get("spend"), None);
    }

    #[tokio::test]
    async fn aggregate_account_propagates_regardless_of_policy() {
        let resolver = Resolver::new(Arc::new(stub()));
        let aggregator = InsightAggregator::new(&resolver, AggregationPolicy::BestEffort);
        let fields: FieldSet = ["clicks", "spend"].into_iter().collect();

        let err = aggregator
            .aggregate_account(&PlatformId::from("meta"), &account("2", "B"), &fields)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error occurred: 500: upstream exploded");

        let totals = aggregator
            .aggregate_account(&PlatformId::from("meta"), &account("1", "A"), &fields)
            .await
            .unwrap();
        assert_eq!(totals.get("clicks"), Some(Metric::Int(13)));
    }
}
