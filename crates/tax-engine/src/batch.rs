use duty_core::{ExtendedTaxResult, Product, TaxResult};

use crate::engine::TaxEngine;

impl TaxEngine {
    /// Run every product through `calculate`, one after another, keeping
    /// each item's outcome.
    pub async fn try_calculate_batch(
        &self,
        products: &[Product],
        country: &str,
    ) -> Vec<TaxResult<ExtendedTaxResult>> {
        let mut results = Vec::with_capacity(products.len());
        for product in products {
            results.push(self.calculate(product, country).await);
        }
        results
    }

    /// Same length and order as `products`. A failed item becomes a
    /// zero-tax placeholder carrying the failure as a warning.
    pub async fn calculate_batch(&self, products: &[Product], country: &str) -> Vec<ExtendedTaxResult> {
        let outcomes = self.try_calculate_batch(products, country).await;
        let country = country.trim().to_uppercase();

        let mut failed = 0usize;
        let results: Vec<ExtendedTaxResult> = products
            .iter()
            .zip(outcomes)
            .map(|(product, outcome)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    failed += 1;
                    tracing::warn!("Batch item {} to {} failed: {}", product.id, country, e);
                    ExtendedTaxResult::placeholder(
                        uuid::Uuid::new_v4().to_string(),
                        product,
                        &country,
                        &self.config().base_currency,
                        &e,
                    )
                }
            })
            .collect();

        tracing::info!(
            "Batch of {} to {} complete ({} failed)",
            results.len(),
            country,
            failed
        );
        results
    }
}
