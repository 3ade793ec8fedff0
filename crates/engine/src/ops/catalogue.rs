//! Products, bins, suppliers and customers.
//!
//! These rows never carry stock by themselves: a new bin starts empty and
//! only the movement operations change its quantity afterwards.

use crate::{
    Bin, Customer, EngineError, NewBinCmd, NewPartyCmd, NewProductCmd, OpContext, Product,
    ResultEngine, Supplier,
    store::{bins, catalogue, ledger},
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

fn referenced(field: &str) -> EngineError {
    EngineError::invalid(field, "unreferenced", "transactions")
}

impl Engine {
    pub async fn new_product(&self, ctx: &OpContext, cmd: NewProductCmd) -> ResultEngine<Product> {
        let name = normalize_required_text(&cmd.name, "name")?;
        let product = with_tx!(self, ctx, |db_tx| {
            catalogue::insert_product(&db_tx, &name, cmd.unit).await
        })?;
        tracing::info!("product {} created", product.code);
        Ok(product)
    }

    /// Add an empty bin to a product.
    pub async fn new_bin(&self, ctx: &OpContext, cmd: NewBinCmd) -> ResultEngine<Bin> {
        let quality = normalize_required_text(&cmd.quality, "quality")?;
        if cmd.price < 0 {
            return Err(EngineError::invalid("price", "gte", 0));
        }
        let bin = with_tx!(self, ctx, |db_tx| {
            catalogue::require_product(&db_tx, &cmd.product_code).await?;
            catalogue::insert_bin(&db_tx, &cmd.product_code, &quality, cmd.price).await
        })?;
        tracing::info!(
            "product quality {} created for product {}",
            bin.id,
            bin.product_code
        );
        Ok(bin)
    }

    pub async fn new_supplier(&self, ctx: &OpContext, cmd: NewPartyCmd) -> ResultEngine<Supplier> {
        let name = normalize_required_text(&cmd.name, "name")?;
        let address = normalize_optional_text(cmd.address.as_deref());
        let phone = normalize_optional_text(cmd.phone.as_deref());
        let supplier = with_tx!(self, ctx, |db_tx| {
            catalogue::insert_supplier(&db_tx, &name, address.clone(), phone.clone()).await
        })?;
        tracing::info!("supplier {} created", supplier.code);
        Ok(supplier)
    }

    pub async fn new_customer(&self, ctx: &OpContext, cmd: NewPartyCmd) -> ResultEngine<Customer> {
        let name = normalize_required_text(&cmd.name, "name")?;
        let address = normalize_optional_text(cmd.address.as_deref());
        let phone = normalize_optional_text(cmd.phone.as_deref());
        let customer = with_tx!(self, ctx, |db_tx| {
            catalogue::insert_customer(&db_tx, &name, address.clone(), phone.clone()).await
        })?;
        tracing::info!("customer {} created", customer.code);
        Ok(customer)
    }

    /// Delete a product and its bins.
    ///
    /// Refused while any movement references one of the bins: the ledger
    /// would lose the stock history it explains.
    pub async fn delete_product(&self, ctx: &OpContext, code: &str) -> ResultEngine<()> {
        with_tx!(self, ctx, |db_tx| {
            catalogue::require_product(&db_tx, code).await?;
            let bin_ids: Vec<i32> = bins::find_all_by_product_code(&db_tx, code)
                .await?
                .iter()
                .map(|bin| bin.id)
                .collect();
            if ledger::count_by_bins(&db_tx, &bin_ids).await? > 0 {
                return Err(referenced("code"));
            }
            catalogue::delete_product(&db_tx, code).await
        })?;
        tracing::info!("product {code} deleted");
        Ok(())
    }

    /// Delete a bin no movement references.
    pub async fn delete_bin(&self, ctx: &OpContext, id: i32) -> ResultEngine<()> {
        with_tx!(self, ctx, |db_tx| {
            bins::find_for_update(&db_tx, id).await?;
            if ledger::count_by_bins(&db_tx, &[id]).await? > 0 {
                return Err(referenced("id"));
            }
            bins::delete(&db_tx, id).await
        })?;
        tracing::info!("product quality {id} deleted");
        Ok(())
    }

    pub async fn list_products(&self, ctx: &OpContext) -> ResultEngine<Vec<Product>> {
        ctx.guard(catalogue::find_all_products(&self.database)).await
    }

    pub async fn product(&self, ctx: &OpContext, code: &str) -> ResultEngine<Product> {
        ctx.guard(catalogue::require_product(&self.database, code))
            .await
    }

    pub async fn list_suppliers(&self, ctx: &OpContext) -> ResultEngine<Vec<Supplier>> {
        ctx.guard(catalogue::find_all_suppliers(&self.database))
            .await
    }

    pub async fn supplier(&self, ctx: &OpContext, code: &str) -> ResultEngine<Supplier> {
        ctx.guard(catalogue::require_supplier(&self.database, code))
            .await
    }

    pub async fn list_customers(&self, ctx: &OpContext) -> ResultEngine<Vec<Customer>> {
        ctx.guard(catalogue::find_all_customers(&self.database))
            .await
    }

    pub async fn customer(&self, ctx: &OpContext, code: &str) -> ResultEngine<Customer> {
        ctx.guard(catalogue::require_customer(&self.database, code))
            .await
    }
}
