/// Appointment operations shared by the HTTP handlers
///
/// Writes go through the storage transaction first; listings are invalidated only
/// after it commits.
use crate::services::ResponseCache;
use clinic_core::{
    Appointment, AppointmentId, AppointmentQuery, DateCount, Page, ProposedAppointment,
    ReportFilters, Result,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SchedulingService {
    pool: SqlitePool,
    cache: Option<Arc<ResponseCache>>,
}

impl SchedulingService {
    pub fn new(pool: SqlitePool, cache: Option<Arc<ResponseCache>>) -> Self {
        Self { pool, cache }
    }

    /// List appointments, serving unfiltered pages from the cache when possible
    pub async fn list(&self, query: AppointmentQuery) -> Result<Arc<Page<Appointment>>> {
        let cache = self.cache.as_ref().filter(|_| query.filters.is_empty());
        let Some(cache) = cache else {
            return Ok(Arc::new(clinic_storage::appointments::list(&self.pool, query).await?));
        };

        let key = cache.list_key(query.scope, query.pagination);
        if let Some(page) = cache.get(&key) {
            return Ok(page);
        }

        let page = Arc::new(clinic_storage::appointments::list(&self.pool, query).await?);
        cache.insert(key, Arc::clone(&page));
        Ok(page)
    }

    pub async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        clinic_storage::appointments::get_by_id(&self.pool, id).await
    }

    pub async fn create(&self, proposed: &ProposedAppointment) -> Result<Appointment> {
        let appointment = clinic_storage::appointments::create(&self.pool, proposed).await?;
        self.invalidate();
        Ok(appointment)
    }

    pub async fn update(
        &self,
        id: AppointmentId,
        proposed: &ProposedAppointment,
    ) -> Result<Appointment> {
        let appointment = clinic_storage::appointments::update(&self.pool, id, proposed).await?;
        self.invalidate();
        Ok(appointment)
    }

    pub async fn delete(&self, id: AppointmentId) -> Result<()> {
        clinic_storage::appointments::delete(&self.pool, id).await?;
        self.invalidate();
        Ok(())
    }

    pub async fn report(&self, filters: &ReportFilters) -> Result<Vec<DateCount>> {
        clinic_storage::appointments::report(&self.pool, filters).await
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }
}
