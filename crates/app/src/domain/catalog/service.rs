//! Catalog service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::{
        catalog::{
            data::{NewCatalogItem, NewCategory},
            errors::CatalogServiceError,
            records::{
                CatalogItemRecord, CatalogItemUuid, CategoryRecord, CategoryUuid, PriceSnapshot,
            },
            repositories::{PgCatalogItemsRepository, PgCategoriesRepository},
            tree::CategoryTree,
        },
        tenants::records::TenantUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCatalogService {
    db: Db,
    items: PgCatalogItemsRepository,
    categories: PgCategoriesRepository,
}

impl PgCatalogService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            items: PgCatalogItemsRepository::new(),
            categories: PgCategoriesRepository::new(),
        }
    }
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn create_item(
        &self,
        tenant: TenantUuid,
        item: NewCatalogItem,
    ) -> Result<CatalogItemRecord, CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let created = self.items.create_item(&mut tx, item).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_item(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<CatalogItemRecord, CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let item = self.items.get_item(&mut tx, item).await?;

        tx.commit().await?;

        Ok(item)
    }

    async fn delete_item(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<(), CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let rows_affected = self.items.delete_item(&mut tx, item).await?;

        if rows_affected == 0 {
            return Err(CatalogServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn price_snapshot(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<PriceSnapshot, CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let item = self.items.get_item(&mut tx, item).await?;

        tx.commit().await?;

        Ok(PriceSnapshot {
            description: item.name,
            unit: item.unit,
            unit_price: item.unit_price,
            tax_rate_bps: item.tax_rate_bps,
        })
    }

    async fn create_category(
        &self,
        tenant: TenantUuid,
        category: NewCategory,
    ) -> Result<CategoryRecord, CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let created = self.categories.create_category(&mut tx, category).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn category_tree(&self, tenant: TenantUuid) -> Result<CategoryTree, CatalogServiceError> {
        let mut tx = self.db.begin_tenant_transaction(tenant).await?;

        let records = self.categories.list_categories(&mut tx).await?;

        tx.commit().await?;

        Ok(CategoryTree::build(records))
    }
}

#[automock]
#[async_trait]
/// Catalog collaborator: items priced for snapshotting plus the browsable
/// category hierarchy.
pub trait CatalogService: Send + Sync {
    /// Creates a new catalog item.
    async fn create_item(
        &self,
        tenant: TenantUuid,
        item: NewCatalogItem,
    ) -> Result<CatalogItemRecord, CatalogServiceError>;

    /// Fetches a catalog item by UUID.
    async fn get_item(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<CatalogItemRecord, CatalogServiceError>;

    /// Soft-deletes a catalog item.
    async fn delete_item(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<(), CatalogServiceError>;

    /// Read-only `{price, tax, unit}` snapshot of an item as of now.
    async fn price_snapshot(
        &self,
        tenant: TenantUuid,
        item: CatalogItemUuid,
    ) -> Result<PriceSnapshot, CatalogServiceError>;

    /// Creates a new category.
    async fn create_category(
        &self,
        tenant: TenantUuid,
        category: NewCategory,
    ) -> Result<CategoryRecord, CatalogServiceError>;

    /// The tenant's category hierarchy, loaded in one query and capped at
    /// three levels.
    async fn category_tree(&self, tenant: TenantUuid) -> Result<CategoryTree, CatalogServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::{TestContext, helpers};

    use super::*;

    #[tokio::test]
    async fn create_item_returns_created_record() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = CatalogItemUuid::new();

        let item = ctx
            .catalog
            .create_item(
                ctx.tenant_uuid,
                NewCatalogItem {
                    uuid,
                    category_uuid: None,
                    name: "Consulting".to_string(),
                    unit: "hour".to_string(),
                    unit_price: 150_00,
                    tax_rate_bps: 1900,
                },
            )
            .await?;

        assert_eq!(item.uuid, uuid);
        assert_eq!(item.unit_price, 150_00);
        assert_eq!(item.tax_rate_bps, 1900);

        Ok(())
    }

    #[tokio::test]
    async fn price_snapshot_reflects_current_item_state() -> TestResult {
        let ctx = TestContext::new().await;

        let item = helpers::create_catalog_item(&ctx, ctx.tenant_uuid, 99_90, 700).await?;

        let snapshot = ctx
            .catalog
            .price_snapshot(ctx.tenant_uuid, item.uuid)
            .await?;

        assert_eq!(snapshot.unit_price, 99_90);
        assert_eq!(snapshot.tax_rate_bps, 700);
        assert_eq!(snapshot.description, item.name);

        Ok(())
    }

    #[tokio::test]
    async fn price_snapshot_of_deleted_item_returns_not_found() -> TestResult {
        let ctx = TestContext::new().await;

        let item = helpers::create_catalog_item(&ctx, ctx.tenant_uuid, 10_00, 1900).await?;

        ctx.catalog.delete_item(ctx.tenant_uuid, item.uuid).await?;

        let result = ctx.catalog.price_snapshot(ctx.tenant_uuid, item.uuid).await;

        assert!(
            matches!(result, Err(CatalogServiceError::NotFound)),
            "expected NotFound for deleted item, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn category_tree_returns_hierarchy() -> TestResult {
        let ctx = TestContext::new().await;

        let root = ctx
            .catalog
            .create_category(
                ctx.tenant_uuid,
                NewCategory {
                    uuid: CategoryUuid::new(),
                    name: "Services".to_string(),
                    parent_uuid: None,
                },
            )
            .await?;

        ctx.catalog
            .create_category(
                ctx.tenant_uuid,
                NewCategory {
                    uuid: CategoryUuid::new(),
                    name: "Development".to_string(),
                    parent_uuid: Some(root.uuid),
                },
            )
            .await?;

        let tree = ctx.catalog.category_tree(ctx.tenant_uuid).await?;

        assert_eq!(tree.len(), 2);

        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(roots.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn category_tree_not_visible_to_other_tenant() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.catalog
            .create_category(
                ctx.tenant_uuid,
                NewCategory {
                    uuid: CategoryUuid::new(),
                    name: "Private".to_string(),
                    parent_uuid: None,
                },
            )
            .await?;

        let tenant_b = ctx.create_tenant("Tenant B").await;

        let tree = ctx.catalog.category_tree(tenant_b).await?;

        assert!(tree.is_empty(), "tenant B must not see tenant A categories");

        Ok(())
    }
}
