//! Read-only views over the ledger and the bins.
//!
//! Reads go straight to the pool: no transaction, no locks.

use crate::{
    Bin, BinWithProduct, Movement, MovementDetail, OpContext, Page, PageRequest, ResultEngine,
    store::{bins, catalogue, ledger},
};

use super::Engine;

impl Engine {
    /// A page of the ledger, newest first, with the size of the whole ledger.
    pub async fn list_movements(
        &self,
        ctx: &OpContext,
        page: PageRequest,
    ) -> ResultEngine<Page<Movement>> {
        let items = ctx
            .guard(ledger::find_all(&self.database, page.offset, page.limit))
            .await?;
        let total = ctx.guard(ledger::count(&self.database)).await?;
        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    pub async fn movement(&self, ctx: &OpContext, code: &str) -> ResultEngine<Movement> {
        ctx.guard(ledger::find_by_code(&self.database, code)).await
    }

    /// A movement with its bins, their products and its counterparty.
    pub async fn movement_detail(
        &self,
        ctx: &OpContext,
        code: &str,
    ) -> ResultEngine<MovementDetail> {
        ctx.guard(ledger::find_by_code_with_associations(&self.database, code))
            .await
    }

    pub async fn movements_by_supplier(
        &self,
        ctx: &OpContext,
        supplier_code: &str,
    ) -> ResultEngine<Vec<Movement>> {
        ctx.guard(ledger::find_all_by_supplier_code(&self.database, supplier_code))
            .await
    }

    pub async fn movements_by_customer(
        &self,
        ctx: &OpContext,
        customer_code: &str,
    ) -> ResultEngine<Vec<Movement>> {
        ctx.guard(ledger::find_all_by_customer_code(&self.database, customer_code))
            .await
    }

    /// Every movement touching a bin, as target or source, oldest first.
    pub async fn movements_by_bin(
        &self,
        ctx: &OpContext,
        bin_id: i32,
    ) -> ResultEngine<Vec<Movement>> {
        ctx.guard(ledger::find_all_by_bin(&self.database, bin_id))
            .await
    }

    pub async fn list_bins(&self, ctx: &OpContext) -> ResultEngine<Vec<BinWithProduct>> {
        ctx.guard(bins::find_all(&self.database)).await
    }

    /// Bins of a product; `NotFound` when the product does not exist.
    pub async fn bins_by_product(
        &self,
        ctx: &OpContext,
        product_code: &str,
    ) -> ResultEngine<Vec<Bin>> {
        ctx.guard(async {
            catalogue::require_product(&self.database, product_code).await?;
            bins::find_all_by_product_code(&self.database, product_code).await
        })
        .await
    }

    pub async fn bin(&self, ctx: &OpContext, id: i32) -> ResultEngine<BinWithProduct> {
        ctx.guard(bins::find_by_id_with_product(&self.database, id))
            .await
    }
}
