use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

use crate::model::employee::Employee;

/// Employee records keyed by id. Date of joining and position change
/// rarely, so a short TTL keeps the balance endpoints off the employees
/// table without letting edits go stale for long.
pub static EMPLOYEE_CACHE: Lazy<Cache<u64, Arc<Employee>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000) // tune based on memory
        .time_to_live(Duration::from_secs(600)) // 10 min TTL
        .build()
});

/// Refresh the cached record after a write.
pub async fn put(employee: Employee) {
    EMPLOYEE_CACHE.insert(employee.id, Arc::new(employee)).await;
}

/// Drop a record after update or delete so the next read refetches.
pub async fn invalidate(employee_id: u64) {
    EMPLOYEE_CACHE.invalidate(&employee_id).await;
}

/// Read-through fetch used by the balance endpoints.
pub async fn get_or_load(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<Arc<Employee>>, sqlx::Error> {
    if let Some(hit) = EMPLOYEE_CACHE.get(&employee_id).await {
        return Ok(Some(hit));
    }

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;

    match employee {
        Some(employee) => {
            let employee = Arc::new(employee);
            EMPLOYEE_CACHE.insert(employee_id, employee.clone()).await;
            Ok(Some(employee))
        }
        None => Ok(None),
    }
}

/// Load active employees into the in-memory cache (batched)
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, Employee>(
        r#"
        SELECT *
        FROM employees
        WHERE status = 'active'
        ORDER BY id
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let employee: Employee = row?;
        batch.push(employee);
        total_count += 1;

        if batch.len() >= batch_size {
            for employee in batch.drain(..) {
                put(employee).await;
            }
        }
    }

    // Insert any remaining employees
    for employee in batch.drain(..) {
        put(employee).await;
    }

    log::info!(
        "Employee cache warmup complete: {} active employees",
        total_count
    );

    Ok(())
}
