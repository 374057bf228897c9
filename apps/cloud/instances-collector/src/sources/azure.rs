//! Azure virtual machines: ARM locations and SKUs, retail prices per region.

use domain_instances::{
    Aggregator, AzureLocationList, AzureSkuPage, RetailPricePage, ServiceKind,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{join_url, SourceContext};
use crate::config::AzureCredentials;
use crate::fetch::{fetch_document, FetchError, OfferFetcher};
use crate::pool::{PoolSummary, TaskContext};

const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
const LOCATIONS_API_VERSION: &str = "2022-12-01";
const SKUS_API_VERSION: &str = "2021-07-01";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub async fn collect(context: &SourceContext, aggregator: &mut Aggregator) -> PoolSummary {
    let mut summary = PoolSummary::default();
    let azure = &context.config.azure;

    let credentials = match azure.credentials() {
        Ok(credentials) => credentials,
        Err(error) => {
            summary.record_failure(
                TaskContext::new(ServiceKind::Azure, "token"),
                &FetchError::Auth(error.to_string()),
            );
            return summary;
        }
    };

    let token = match access_token(context.fetcher.as_ref(), &azure.login_url, &credentials).await {
        Ok(token) => token,
        Err(error) => {
            summary.record_failure(TaskContext::new(ServiceKind::Azure, "token"), &error);
            return summary;
        }
    };

    let subscription = join_url(
        &azure.management_url,
        &format!("subscriptions/{}", credentials.subscription_id),
    );

    let locations_url = format!("{subscription}/locations?api-version={LOCATIONS_API_VERSION}");
    let locations: AzureLocationList =
        match fetch_document(context.fetcher.as_ref(), &locations_url, Some(token.clone())).await {
            Ok(locations) => locations,
            Err(error) => {
                summary.record_failure(TaskContext::new(ServiceKind::Azure, "locations"), &error);
                return summary;
            }
        };
    let registered = aggregator.fold_azure_locations(&locations);
    info!(regions = registered, "Registered Azure regions");
    summary.succeeded += 1;

    let skus_url = format!(
        "{subscription}/providers/Microsoft.Compute/skus?api-version={SKUS_API_VERSION}"
    );
    match fetch_pages::<AzureSkuPage>(context.fetcher.as_ref(), skus_url, Some(token), |page| {
        page.next_link.clone()
    })
    .await
    {
        Ok(pages) => {
            let specs: usize = pages.iter().map(|page| aggregator.fold_azure_specs(page)).sum();
            info!(specs, "Registered Azure virtual machine SKUs");
            summary.succeeded += 1;
        }
        Err(error) => summary.record_failure(TaskContext::new(ServiceKind::Azure, "skus"), &error),
    }

    let tasks: Vec<_> = locations
        .physical()
        .map(|location| {
            let fetcher = Arc::clone(&context.fetcher);
            let url = retail_prices_url(&azure.retail_prices_url, &location.name);
            let task = async move {
                fetch_pages::<RetailPricePage>(fetcher.as_ref(), url, None, |page| {
                    page.next_page_link.clone()
                })
                .await
            };
            (TaskContext::new(ServiceKind::Azure, "retail-prices").region(location.name.clone()), task)
        })
        .collect();

    summary.merge(
        context
            .pool
            .run(tasks, |task, pages: Vec<RetailPricePage>| {
                let written: usize = pages.iter().map(|page| aggregator.fold_azure_prices(page)).sum();
                info!(task = %task, pages = pages.len(), tuples = written, "Folded Azure retail prices");
            })
            .await,
    );
    summary
}

/// Client-credential token for the management API.
async fn access_token(
    fetcher: &dyn OfferFetcher,
    login_url: &str,
    credentials: &AzureCredentials,
) -> Result<String, FetchError> {
    let url = join_url(login_url, &format!("{}/oauth2/v2.0/token", credentials.tenant_id));
    let form = vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        ("client_id".to_string(), credentials.client_id.clone()),
        ("client_secret".to_string(), credentials.client_secret.clone()),
        ("scope".to_string(), MANAGEMENT_SCOPE.to_string()),
    ];
    let body = fetcher.post_form(&url, form).await?;
    let response: TokenResponse = serde_json::from_slice(&body)
        .map_err(|error| FetchError::Auth(format!("unexpected token response: {error}")))?;
    Ok(response.access_token)
}

/// Retail prices for one region, virtual machines only.
pub fn retail_prices_url(base: &str, region: &str) -> String {
    let filter = format!("serviceName eq 'Virtual Machines' and armRegionName eq '{region}'");
    format!("{base}?$filter={}", urlencoding::encode(&filter))
}

/// Follows `next` links until a page has none.
async fn fetch_pages<T>(
    fetcher: &dyn OfferFetcher,
    first_url: String,
    bearer: Option<String>,
    next: impl Fn(&T) -> Option<String>,
) -> Result<Vec<T>, FetchError>
where
    T: serde::de::DeserializeOwned,
{
    let mut pages = Vec::new();
    let mut url = Some(first_url);
    while let Some(current) = url.take() {
        let page: T = fetch_document(fetcher, &current, bearer.clone()).await?;
        url = next(&page).filter(|link| !link.is_empty() && *link != current);
        debug!(url = %current, more = url.is_some(), "Fetched page");
        pages.push(page);
    }
    Ok(pages)
}
