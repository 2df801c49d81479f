use crate::aggregator::{AggregationPolicy, InsightAggregator, Totals};
use crate::report::{Cell, ColumnUnion, Report, ReportKind, ReportRow};
use adinsights_client::Resolver;
use adinsights_core::{FieldSet, PlatformId, Result};
use tracing::{debug, info};

/// Field sets of every enumerated platform, fetched once per request.
struct FieldCatalog {
    /// `None` where the platform's field list could not be fetched.
    platforms: Vec<(PlatformId, Option<FieldSet>)>,
    columns: Vec<String>,
}

/// Builds the three report shapes out of upstream data.
///
/// The single-platform summary is `FailFast`; both cross-platform reports
/// are `BestEffort` and only fail when the platform list itself cannot be
/// fetched.
#[derive(Clone)]
pub struct ReportBuilder {
    resolver: Resolver,
}

impl ReportBuilder {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// One row per account of `platform`, columns = the platform's fields.
    /// The platform must already have been validated.
    pub async fn platform_summary(&self, platform: &PlatformId) -> Result<Report> {
        let policy = AggregationPolicy::FailFast;
        let aggregator = InsightAggregator::new(&self.resolver, policy);

        let accounts = self
            .resolver
            .list_accounts(platform)
            .await
            .map_err(|e| e.context(format!("Error retrieving accounts for {}", platform)))?;
        let fields = self
            .resolver
            .list_fields(platform)
            .await
            .map_err(|e| e.context(format!("Error retrieving fields for {}", platform)))?;

        let per_account = aggregator
            .aggregate_accounts(platform, &accounts, &fields)
            .await?;

        let mut report = Report::new(ReportKind::PlatformSummary, fields.as_slice().to_vec());
        for row in per_account {
            report.push_row(ReportRow {
                platform: platform.clone(),
                account_name: row.account.name,
                cells: row.totals.values().map(Cell::Metric).collect(),
            });
        }

        info!(platform = %platform, rows = report.rows().len(), "built platform summary");
        Ok(report)
    }

    /// Every insight record of every account of every platform, flattened
    /// onto the union of all field sets. Missing values are empty cells.
    pub async fn general_report(&self) -> Result<Report> {
        let policy = AggregationPolicy::BestEffort;
        let aggregator = InsightAggregator::new(&self.resolver, policy);
        let catalog = self.field_catalog(policy).await?;

        let mut report = Report::new(ReportKind::GeneralReport, catalog.columns.clone());
        for (platform, fields) in &catalog.platforms {
            let Some(fields) = fields else { continue };
            let Some(accounts) = policy.settle(self.resolver.list_accounts(platform).await, || {
                format!("Error retrieving accounts for {}", platform)
            })?
            else {
                continue;
            };

            for account in &accounts {
                let Some(insights) = aggregator.account_insights(platform, account, fields).await?
                else {
                    continue;
                };
                for insight in &insights {
                    report.push_row(ReportRow {
                        platform: platform.clone(),
                        account_name: account.name.clone(),
                        cells: catalog
                            .columns
                            .iter()
                            .map(|column| {
                                insight
                                    .get(column)
                                    .map(Cell::from_json)
                                    .unwrap_or(Cell::Empty)
                            })
                            .collect(),
                    });
                }
            }
        }

        info!(
            rows = report.rows().len(),
            columns = report.columns().len(),
            "built general report"
        );
        Ok(report)
    }

    /// One row per platform with the account name blank, summing every
    /// union column over the platform's accounts. Missing sums are 0.
    pub async fn general_summary(&self) -> Result<Report> {
        let policy = AggregationPolicy::BestEffort;
        let aggregator = InsightAggregator::new(&self.resolver, policy);
        let catalog = self.field_catalog(policy).await?;

        let mut report = Report::new(ReportKind::GeneralSummary, catalog.columns.clone());
        for (platform, fields) in &catalog.platforms {
            let Some(accounts) = policy.settle(self.resolver.list_accounts(platform).await, || {
                format!("Error retrieving accounts for {}", platform)
            })?
            else {
                continue;
            };

            // A platform whose accounts are known but whose fields are not
            // still gets a row, all zeros.
            let totals = match fields {
                Some(fields) => {
                    aggregator
                        .aggregate_platform(platform, &accounts, fields, &catalog.columns)
                        .await?
                }
                None => Totals::zeroed(catalog.columns.iter().map(String::as_str)),
            };

            report.push_row(ReportRow {
                platform: platform.clone(),
                account_name: String::new(),
                cells: totals.values().map(Cell::Metric).collect(),
            });
        }

        info!(
            rows = report.rows().len(),
            columns = report.columns().len(),
            "built general summary"
        );
        Ok(report)
    }

    async fn field_catalog(&self, policy: AggregationPolicy) -> Result<FieldCatalog> {
        let platforms = self.resolver.list_platform_ids().await?;

        let mut union = ColumnUnion::new();
        let mut entries = Vec::with_capacity(platforms.len());
        for platform in platforms {
            let fields = policy.settle(self.resolver.list_fields(&platform).await, || {
                format!("Error retrieving fields for {}", platform)
            })?;
            if let Some(ref fields) = fields {
                union.extend(fields);
            }
            entries.push((platform, fields));
        }

        let columns = union.into_columns();
        debug!(platforms = entries.len(), columns = ?columns, "resolved field union");
        Ok(FieldCatalog {
            platforms: entries,
            columns,
        })
    }
}
