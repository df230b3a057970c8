//! Test Helpers

use crate::{
    domain::{
        catalog::{
            CatalogService, CatalogServiceError,
            data::NewCatalogItem,
            records::{CatalogItemRecord, CatalogItemUuid},
        },
        consent::{ConsentService, ConsentServiceError, records::ConsentRecord},
        customers::{
            CustomersService, CustomersServiceError,
            data::NewCustomer,
            records::{CustomerRecord, CustomerUuid},
        },
        quotes::{
            QuotesService, QuotesServiceError,
            data::{NewQuote, NewQuoteItem},
            records::{QUANTITY_SCALE, QuoteItemUuid, QuoteRecord, QuoteUuid},
        },
        tenants::records::TenantUuid,
    },
    test::TestContext,
};

pub(crate) async fn create_customer(
    ctx: &TestContext,
    tenant: TenantUuid,
) -> Result<CustomerRecord, CustomersServiceError> {
    ctx.customers
        .create_customer(
            tenant,
            NewCustomer {
                uuid: CustomerUuid::new(),
                name: "Grace Hopper".to_string(),
                email: Some("grace@example.com".to_string()),
            },
        )
        .await
}

pub(crate) async fn create_catalog_item(
    ctx: &TestContext,
    tenant: TenantUuid,
    unit_price: u64,
    tax_rate_bps: i32,
) -> Result<CatalogItemRecord, CatalogServiceError> {
    ctx.catalog
        .create_item(
            tenant,
            NewCatalogItem {
                uuid: CatalogItemUuid::new(),
                category_uuid: None,
                name: "Consulting".to_string(),
                unit: "hour".to_string(),
                unit_price,
                tax_rate_bps,
            },
        )
        .await
}

pub(crate) async fn create_quote(
    ctx: &TestContext,
    tenant: TenantUuid,
    customer: CustomerUuid,
    items: &[(CatalogItemUuid, i64)],
) -> Result<QuoteRecord, QuotesServiceError> {
    ctx.quotes
        .create_quote(
            tenant,
            NewQuote {
                uuid: QuoteUuid::new(),
                customer_uuid: customer,
                items: items
                    .iter()
                    .map(|&(catalog_item_uuid, quantity)| NewQuoteItem {
                        uuid: QuoteItemUuid::new(),
                        catalog_item_uuid,
                        quantity,
                    })
                    .collect(),
            },
        )
        .await
}

/// Customer, one 60.00 + 19% line, quote: total 71.40.
pub(crate) async fn create_simple_quote(
    ctx: &TestContext,
    tenant: TenantUuid,
) -> Result<QuoteRecord, QuotesServiceError> {
    let customer = create_customer(ctx, tenant)
        .await
        .map_err(|_| QuotesServiceError::CustomerNotFound)?;

    let item = create_catalog_item(ctx, tenant, 60_00, 1900)
        .await
        .map_err(|_| QuotesServiceError::CatalogItemNotFound)?;

    create_quote(ctx, tenant, customer.uuid, &[(item.uuid, QUANTITY_SCALE)]).await
}

/// Accept the default tenant's quote through the token flow.
pub(crate) async fn accept_quote(
    ctx: &TestContext,
    quote: QuoteUuid,
) -> Result<ConsentRecord, ConsentServiceError> {
    let issued = ctx.consent.issue_token(ctx.tenant_uuid, quote).await?;

    ctx.consent.accept(&issued.token, "192.0.2.10").await
}
