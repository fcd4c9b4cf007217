use anyhow::Result;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Double, Text};

use crate::db::entries_models::*;
use crate::db::DatabaseHandle;
use crate::logger::error;
use crate::stats::WbStatsRow;

pub type EntriesDbHandle = DatabaseHandle;

#[derive(QueryableByName, Debug)]
struct WbStatsResult {
    #[diesel(sql_type = Text)]
    wb: String,
    #[diesel(sql_type = BigInt)]
    entry_count: i64,
    #[diesel(sql_type = BigInt)]
    unique_lemmas: i64,
    #[diesel(sql_type = Double)]
    avg_variants: f64,
    #[diesel(sql_type = Double)]
    avg_definitions: f64,
}

impl EntriesDbHandle {
    /// Inserts or refreshes a batch of entries in one transaction. Returns the
    /// number of rows written.
    pub fn upsert_entries(&self, new_entries: &[NewEntry]) -> Result<usize> {
        use crate::db::entries_schema::entries::dsl::*;

        self.do_write(|db_conn| {
            db_conn.transaction(|conn| {
                let mut written = 0;
                for new_entry in new_entries {
                    written += diesel::insert_into(entries)
                        .values(new_entry)
                        .on_conflict(id)
                        .do_update()
                        .set((new_entry, updated_at.eq(diesel::dsl::now)))
                        .execute(conn)?;
                }
                Ok(written)
            })
        })
    }

    pub fn get_entry(&self, entry_id: &str) -> Option<Entry> {
        use crate::db::entries_schema::entries::dsl::*;

        let entry = self.do_read(|db_conn| {
            entries
                .filter(id.eq(entry_id))
                .select(Entry::as_select())
                .first(db_conn)
                .optional()
        });

        match entry {
            Ok(x) => x,
            Err(e) => {
                error(&format!("get_entry(): {}", e));
                None
            }
        }
    }

    pub fn get_entries_by_lemma(&self, lemma_query: &str) -> Vec<Entry> {
        use crate::db::entries_schema::entries::dsl::*;

        let result = self.do_read(|db_conn| {
            entries
                .filter(lemma.eq(lemma_query))
                .order(id)
                .select(Entry::as_select())
                .load(db_conn)
        });

        result.unwrap_or_else(|e| {
            error(&format!("get_entries_by_lemma(): {}", e));
            Vec::new()
        })
    }

    pub fn count_entries(&self) -> Result<i64> {
        use crate::db::entries_schema::entries::dsl::*;

        self.do_read(|db_conn| entries.count().get_result(db_conn))
    }

    /// Per-dictionary counts and averages, sorted by dictionary code
    pub fn wb_statistics(&self) -> Result<Vec<WbStatsRow>> {
        let rows: Vec<WbStatsResult> = self.do_read(|db_conn| {
            sql_query(
                r#"
                SELECT
                    wb,
                    COUNT(*) AS entry_count,
                    COUNT(DISTINCT lemma) AS unique_lemmas,
                    CAST(AVG(json_array_length(lemma_variants)) AS REAL) AS avg_variants,
                    CAST(AVG(json_array_length(definitions)) AS REAL) AS avg_definitions
                FROM entries
                GROUP BY wb
                ORDER BY wb
                "#,
            )
            .load(db_conn)
        })?;

        Ok(rows
            .into_iter()
            .map(|r| WbStatsRow {
                wb: r.wb,
                entries: r.entry_count,
                unique_lemmas: r.unique_lemmas,
                avg_variants: r.avg_variants,
                avg_definitions: r.avg_definitions,
            })
            .collect())
    }
}
