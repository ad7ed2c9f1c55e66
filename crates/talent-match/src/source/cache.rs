//! Time-expiring cache for the two small reference lists used to populate
//! selection inputs. Never consulted by the matching computation itself,
//! which always fetches fresh tables.

use super::{table, tables, Row, SourceError, TableSource};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EmployeeOption {
    pub employee_id: String,
    /// Display label, `fullname (employee_id)`.
    pub label: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReferenceLists {
    pub employees: Vec<EmployeeOption>,
    pub roles: Vec<String>,
}

/// Read-mostly cache refreshed wholesale on expiry; there is no partial
/// invalidation.
pub struct ReferenceCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<ReferenceLists>)>>,
}

impl ReferenceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn get_or_refresh<S: TableSource>(
        &self,
        source: &S,
    ) -> Result<Arc<ReferenceLists>, SourceError> {
        {
            let guard = self.slot.lock().expect("reference cache mutex poisoned");
            if let Some((loaded_at, lists)) = guard.as_ref() {
                if loaded_at.elapsed() < self.ttl {
                    return Ok(lists.clone());
                }
            }
        }

        let lists = Arc::new(load_reference_lists(source)?);
        let mut guard = self.slot.lock().expect("reference cache mutex poisoned");
        *guard = Some((Instant::now(), lists.clone()));
        Ok(lists)
    }
}

fn load_reference_lists<S: TableSource>(source: &S) -> Result<ReferenceLists, SourceError> {
    let employee_rows = source.fetch_all(table::EMPLOYEES)?;
    let position_rows = source.fetch_all(table::DIM_POSITIONS)?;

    let mut employees: Vec<EmployeeOption> = employee_rows
        .iter()
        .filter_map(employee_option)
        .collect();
    employees.sort_by(|a, b| a.label.cmp(&b.label));

    let roles: BTreeSet<String> = position_rows
        .iter()
        .filter_map(|row| tables::text_field(row, "name"))
        .collect();

    Ok(ReferenceLists {
        employees,
        roles: roles.into_iter().collect(),
    })
}

fn employee_option(row: &Row) -> Option<EmployeeOption> {
    let employee_id = tables::text_field(row, "employee_id")?;
    let fullname = tables::text_field(row, "fullname")?;
    Some(EmployeeOption {
        label: format!("{fullname} ({employee_id})"),
        employee_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        tables: HashMap<&'static str, Vec<Row>>,
        fetches: AtomicUsize,
    }

    impl TableSource for CountingSource {
        fn fetch_all(&self, table: &str) -> Result<Vec<Row>, SourceError> {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            Ok(self.tables.get(table).cloned().unwrap_or_default())
        }
    }

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).expect("fixture rows deserialize")
    }

    fn source() -> CountingSource {
        let mut tables = HashMap::new();
        tables.insert(
            table::EMPLOYEES,
            rows(json!([
                { "employee_id": "E2", "fullname": "Sari" },
                { "employee_id": "E1", "fullname": "Joko" },
                { "employee_id": "E3" }
            ])),
        );
        tables.insert(
            table::DIM_POSITIONS,
            rows(json!([
                { "position_id": "p1", "name": "Data Analyst" },
                { "position_id": "p2", "name": "Data Analyst" },
                { "position_id": "p3", "name": "Account Manager" }
            ])),
        );
        CountingSource {
            tables,
            fetches: AtomicUsize::new(0),
        }
    }

    #[test]
    fn builds_sorted_labels_and_distinct_roles() {
        let cache = ReferenceCache::new(Duration::from_secs(60));
        let lists = cache.get_or_refresh(&source()).expect("lists load");

        let labels: Vec<&str> = lists.employees.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Joko (E1)", "Sari (E2)"]);
        assert_eq!(lists.roles, vec!["Account Manager", "Data Analyst"]);
    }

    #[test]
    fn serves_cached_lists_until_expiry() {
        let fixture = source();
        let cache = ReferenceCache::new(Duration::from_secs(60));

        cache.get_or_refresh(&fixture).expect("first load");
        cache.get_or_refresh(&fixture).expect("cached load");

        // Two tables fetched exactly once.
        assert_eq!(fixture.fetches.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn refreshes_wholesale_after_expiry() {
        let fixture = source();
        let cache = ReferenceCache::new(Duration::ZERO);

        cache.get_or_refresh(&fixture).expect("first load");
        cache.get_or_refresh(&fixture).expect("expired load");

        assert_eq!(fixture.fetches.load(Ordering::Relaxed), 4);
    }
}
