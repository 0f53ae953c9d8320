use crate::config::PipelineConfig;
use crate::outcome::{Difficulty, OutcomeLabel};
use crate::point_in_time::{PointInTimeError, PointInTimeView};
use crate::price::PricePoint;
use crate::scenario::{PlayRecord, Scenario};
use crate::security::{CapTier, Security};
use crate::statement::StatementPeriod;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// SQLite-backed store for securities, statements, prices, and scenarios.
///
/// Schema is created automatically on open. All natural-key uniqueness
/// (symbol, (security, fiscal_year), (security, date), (security, as_of))
/// is enforced by storage constraints, so concurrent ingestion of
/// overlapping data cannot race an application-level check-then-insert.
///
/// Statements deliberately have no public raw accessor: the only read path
/// is [`ScenarioStore::statement_view`], which applies the point-in-time
/// filter. Presentation code cannot fetch unfiltered statements.
#[derive(Debug)]
pub struct ScenarioStore {
    conn: Connection,
}

/// Filters for random playable-scenario selection.
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    pub difficulty: Option<Difficulty>,
    pub sector: Option<String>,
    /// Scenario ids the player has already seen this session
    pub exclude_ids: Vec<i64>,
}

/// A scenario joined with the masked identity shown during guessing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableScenario {
    pub scenario: Scenario,
    pub masked_name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// A scenario joined with the real identity, for the reveal screen only.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealRecord {
    pub scenario: Scenario,
    pub symbol: String,
    pub company_name: String,
}

/// Row counts for the admin status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub securities: i64,
    pub scenarios: i64,
    pub playable_scenarios: i64,
}

impl ScenarioStore {
    /// Opens (creating if necessary) a file-backed store.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // Writers from other processes (or threads on a shared file) wait
        // instead of failing with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = ScenarioStore { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS securities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                company_name TEXT NOT NULL,
                masked_name TEXT NOT NULL UNIQUE,
                sector TEXT,
                industry TEXT,
                cap_tier TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS statements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                security_id INTEGER NOT NULL REFERENCES securities(id),
                fiscal_year INTEGER NOT NULL,
                period_end TEXT NOT NULL,
                available_from TEXT NOT NULL,
                revenue REAL NOT NULL,
                gross_profit REAL,
                operating_income REAL,
                ebitda REAL,
                net_income REAL,
                gross_margin REAL,
                operating_margin REAL,
                net_margin REAL,
                total_assets REAL,
                total_debt REAL,
                cash_and_equivalents REAL,
                total_equity REAL,
                operating_cash_flow REAL,
                capital_expenditures REAL,
                free_cash_flow REAL,
                shares_outstanding REAL,
                UNIQUE(security_id, fiscal_year)
            );

            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                security_id INTEGER NOT NULL REFERENCES securities(id),
                date TEXT NOT NULL,
                adj_close REAL NOT NULL,
                volume INTEGER,
                UNIQUE(security_id, date)
            );

            CREATE TABLE IF NOT EXISTS scenarios (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                security_id INTEGER NOT NULL REFERENCES securities(id),
                as_of TEXT NOT NULL,
                price_at_as_of REAL NOT NULL,
                price_at_6mo REAL,
                price_at_12mo REAL,
                price_at_24mo REAL NOT NULL,
                return_6mo REAL,
                return_12mo REAL,
                return_24mo REAL NOT NULL,
                label TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                narrative TEXT,
                times_played INTEGER NOT NULL DEFAULT 0,
                correct_guesses INTEGER NOT NULL DEFAULT 0,
                UNIQUE(security_id, as_of)
            );

            CREATE TABLE IF NOT EXISTS plays (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                scenario_id INTEGER NOT NULL REFERENCES scenarios(id),
                choice TEXT NOT NULL,
                is_correct INTEGER NOT NULL,
                played_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scenarios_label ON scenarios(label);
            CREATE INDEX IF NOT EXISTS idx_scenarios_difficulty ON scenarios(difficulty);
            CREATE INDEX IF NOT EXISTS idx_statements_security ON statements(security_id);
            CREATE INDEX IF NOT EXISTS idx_prices_security_date ON price_history(security_id, date);",
        )?;
        Ok(())
    }

    // -- securities --------------------------------------------------------

    /// Inserts a security or refreshes its classification fields.
    ///
    /// On conflict with an existing symbol, company name, sector, industry
    /// and cap tier are refreshed; the masked name and active flag are
    /// preserved so in-flight games stay consistent.
    ///
    /// # Returns
    /// The row id of the inserted or updated security.
    pub fn upsert_security(&self, security: &Security) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO securities (symbol, company_name, masked_name, sector, industry, cap_tier, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(symbol) DO UPDATE SET
                company_name = excluded.company_name,
                sector = excluded.sector,
                industry = excluded.industry,
                cap_tier = excluded.cap_tier",
            params![
                security.symbol,
                security.company_name,
                security.masked_name,
                security.sector,
                security.industry,
                security.cap_tier.as_str(),
                security.is_active,
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM securities WHERE symbol = ?1",
            [&security.symbol],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Looks up a security by symbol.
    pub fn security_by_symbol(&self, symbol: &str) -> Result<Option<Security>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, symbol, company_name, masked_name, sector, industry, cap_tier, is_active
                 FROM securities WHERE symbol = ?1",
                [symbol],
                |row| {
                    let tier: String = row.get(6)?;
                    Ok(Security {
                        id: Some(row.get(0)?),
                        symbol: row.get(1)?,
                        company_name: row.get(2)?,
                        masked_name: row.get(3)?,
                        sector: row.get(4)?,
                        industry: row.get(5)?,
                        cap_tier: CapTier::parse(&tier).unwrap_or(CapTier::Small),
                        is_active: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Marks a security inactive. Scenarios stay resolvable but stop being
    /// served from the playable pool.
    ///
    /// # Returns
    /// `true` if a row was updated.
    pub fn deactivate_security(&self, symbol: &str) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE securities SET is_active = 0 WHERE symbol = ?1",
            [symbol],
        )?;
        Ok(changed > 0)
    }

    /// All masked names currently in use, for uniqueness during ingestion.
    pub fn masked_names(&self) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT masked_name FROM securities")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    // -- statements --------------------------------------------------------

    /// Upserts statement rows for a security, one per fiscal year.
    ///
    /// Each (security, fiscal_year) row in the batch replaces any stored row
    /// for that year inside one transaction. Years absent from the batch are
    /// left untouched, so a partial re-ingest never erases older history.
    pub fn replace_statements(
        &mut self,
        security_id: i64,
        statements: &[StatementPeriod],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO statements (
                    security_id, fiscal_year, period_end, available_from, revenue,
                    gross_profit, operating_income, ebitda, net_income,
                    gross_margin, operating_margin, net_margin,
                    total_assets, total_debt, cash_and_equivalents, total_equity,
                    operating_cash_flow, capital_expenditures, free_cash_flow,
                    shares_outstanding
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            )?;
            for s in statements {
                stmt.execute(params![
                    security_id,
                    s.fiscal_year,
                    s.period_end,
                    s.available_from,
                    s.revenue,
                    s.gross_profit,
                    s.operating_income,
                    s.ebitda,
                    s.net_income,
                    s.gross_margin,
                    s.operating_margin,
                    s.net_margin,
                    s.total_assets,
                    s.total_debt,
                    s.cash_and_equivalents,
                    s.total_equity,
                    s.operating_cash_flow,
                    s.capital_expenditures,
                    s.free_cash_flow,
                    s.shares_outstanding,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Full statement history, ascending by period end.
    ///
    /// Intentionally private: callers outside this module go through
    /// `statement_view`, which applies the point-in-time filter.
    fn statement_history(&self, security_id: i64) -> Result<Vec<StatementPeriod>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT fiscal_year, period_end, available_from, revenue,
                    gross_profit, operating_income, ebitda, net_income,
                    gross_margin, operating_margin, net_margin,
                    total_assets, total_debt, cash_and_equivalents, total_equity,
                    operating_cash_flow, capital_expenditures, free_cash_flow,
                    shares_outstanding
             FROM statements WHERE security_id = ?1 ORDER BY period_end",
        )?;
        let rows = stmt.query_map([security_id], |row| {
            Ok(StatementPeriod {
                fiscal_year: row.get(0)?,
                period_end: row.get(1)?,
                available_from: row.get(2)?,
                revenue: row.get(3)?,
                gross_profit: row.get(4)?,
                operating_income: row.get(5)?,
                ebitda: row.get(6)?,
                net_income: row.get(7)?,
                gross_margin: row.get(8)?,
                operating_margin: row.get(9)?,
                net_margin: row.get(10)?,
                total_assets: row.get(11)?,
                total_debt: row.get(12)?,
                cash_and_equivalents: row.get(13)?,
                total_equity: row.get(14)?,
                operating_cash_flow: row.get(15)?,
                capital_expenditures: row.get(16)?,
                free_cash_flow: row.get(17)?,
                shares_outstanding: row.get(18)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Builds the point-in-time statement window for one as-of date.
    ///
    /// This is the only statement read path the store exposes.
    ///
    /// # Errors
    /// Returns `StoreError::InsufficientHistory` when fewer than the
    /// configured minimum statements were knowable at the as-of date.
    pub fn statement_view(
        &self,
        security_id: i64,
        as_of: NaiveDate,
        config: &PipelineConfig,
    ) -> Result<PointInTimeView, StoreError> {
        let history = self.statement_history(security_id)?;
        PointInTimeView::build(&history, as_of, config).map_err(StoreError::InsufficientHistory)
    }

    // -- prices ------------------------------------------------------------

    /// Appends price points, ignoring dates already present.
    ///
    /// # Returns
    /// The number of rows actually inserted.
    pub fn append_price_points(
        &mut self,
        security_id: i64,
        points: &[PricePoint],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO price_history (security_id, date, adj_close, volume)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for p in points {
                inserted += stmt.execute(params![security_id, p.date, p.adj_close, p.volume])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Price series between two dates inclusive, ascending.
    pub fn price_series(
        &self,
        security_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, adj_close, volume FROM price_history
             WHERE security_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date",
        )?;
        let rows = stmt.query_map(params![security_id, from, to], |row| {
            Ok(PricePoint {
                date: row.get(0)?,
                adj_close: row.get(1)?,
                volume: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Full price history for a security, ascending. Feeds batch scenario
    /// regeneration.
    pub fn price_history(&self, security_id: i64) -> Result<Vec<PricePoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, adj_close, volume FROM price_history
             WHERE security_id = ?1 ORDER BY date",
        )?;
        let rows = stmt.query_map([security_id], |row| {
            Ok(PricePoint {
                date: row.get(0)?,
                adj_close: row.get(1)?,
                volume: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Ids of all securities with at least one price bar.
    pub fn security_ids_with_prices(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT security_id FROM price_history ORDER BY security_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    // -- scenarios ---------------------------------------------------------

    /// Inserts scenarios, ignoring (security, as_of) pairs already stored.
    ///
    /// An existing scenario's computed outcome is never overwritten: once a
    /// scenario has been played, its ground truth must not shift under the
    /// player. Uniqueness is the storage constraint, so concurrent upserts
    /// of overlapping batches cannot duplicate rows.
    ///
    /// # Returns
    /// The number of rows actually inserted.
    pub fn upsert_scenarios(&mut self, scenarios: &[Scenario]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO scenarios (
                    security_id, as_of, price_at_as_of, price_at_6mo, price_at_12mo,
                    price_at_24mo, return_6mo, return_12mo, return_24mo,
                    label, difficulty, narrative
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for s in scenarios {
                inserted += stmt.execute(params![
                    s.security_id,
                    s.as_of,
                    s.price_at_as_of,
                    s.price_at_6mo,
                    s.price_at_12mo,
                    s.price_at_24mo,
                    s.return_6mo,
                    s.return_12mo,
                    s.return_24mo,
                    s.label.as_str(),
                    s.difficulty.as_str(),
                    s.narrative,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Picks one random playable scenario honoring the given filters.
    ///
    /// Playable means label is value or trap (never neutral) and the
    /// security is active.
    ///
    /// # Errors
    /// Returns `StoreError::NoPlayableScenario` when no candidate remains.
    /// With a non-empty `exclude_ids` this signals "player exhausted the
    /// pool" rather than "pool is empty".
    pub fn select_random_playable(
        &self,
        filter: &ScenarioFilter,
    ) -> Result<PlayableScenario, StoreError> {
        let mut sql = String::from(
            "SELECT s.id, s.security_id, s.as_of, s.price_at_as_of, s.price_at_6mo,
                    s.price_at_12mo, s.price_at_24mo, s.return_6mo, s.return_12mo,
                    s.return_24mo, s.label, s.difficulty, s.narrative,
                    s.times_played, s.correct_guesses,
                    sec.masked_name, sec.sector, sec.industry
             FROM scenarios s
             JOIN securities sec ON s.security_id = sec.id
             WHERE sec.is_active = 1
               AND s.label IN ('value', 'trap')",
        );
        let mut bind: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(difficulty) = filter.difficulty {
            sql.push_str(&format!(" AND s.difficulty = ?{}", bind.len() + 1));
            bind.push(Box::new(difficulty.as_str()));
        }
        if let Some(sector) = &filter.sector {
            sql.push_str(&format!(" AND sec.sector = ?{}", bind.len() + 1));
            bind.push(Box::new(sector.clone()));
        }
        if !filter.exclude_ids.is_empty() {
            let placeholders: Vec<String> = filter
                .exclude_ids
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", bind.len() + i + 1))
                .collect();
            sql.push_str(&format!(" AND s.id NOT IN ({})", placeholders.join(",")));
            for id in &filter.exclude_ids {
                bind.push(Box::new(*id));
            }
        }
        sql.push_str(" ORDER BY RANDOM() LIMIT 1");

        let mut stmt = self.conn.prepare(&sql)?;
        let row = stmt
            .query_row(params_from_iter(bind.iter()), |row| {
                Ok(PlayableScenario {
                    scenario: scenario_from_row(row)?,
                    masked_name: row.get(15)?,
                    sector: row.get(16)?,
                    industry: row.get(17)?,
                })
            })
            .optional()?;

        row.ok_or(StoreError::NoPlayableScenario)
    }

    /// Looks up one scenario by id.
    pub fn scenario(&self, scenario_id: i64) -> Result<Scenario, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, security_id, as_of, price_at_as_of, price_at_6mo,
                    price_at_12mo, price_at_24mo, return_6mo, return_12mo,
                    return_24mo, label, difficulty, narrative,
                    times_played, correct_guesses
             FROM scenarios WHERE id = ?1",
        )?;
        stmt.query_row([scenario_id], scenario_from_row)
            .optional()?
            .ok_or(StoreError::ScenarioNotFound(scenario_id))
    }

    /// Scenario plus the real identity of its security, for the reveal path.
    pub fn reveal_lookup(&self, scenario_id: i64) -> Result<RevealRecord, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.security_id, s.as_of, s.price_at_as_of, s.price_at_6mo,
                    s.price_at_12mo, s.price_at_24mo, s.return_6mo, s.return_12mo,
                    s.return_24mo, s.label, s.difficulty, s.narrative,
                    s.times_played, s.correct_guesses,
                    sec.symbol, sec.company_name
             FROM scenarios s
             JOIN securities sec ON s.security_id = sec.id
             WHERE s.id = ?1",
        )?;
        stmt.query_row([scenario_id], |row| {
            Ok(RevealRecord {
                scenario: scenario_from_row(row)?,
                symbol: row.get(15)?,
                company_name: row.get(16)?,
            })
        })
        .optional()?
        .ok_or(StoreError::ScenarioNotFound(scenario_id))
    }

    /// Attaches narrative text to a scenario.
    pub fn attach_narrative(&self, scenario_id: i64, narrative: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE scenarios SET narrative = ?1 WHERE id = ?2",
            params![narrative, scenario_id],
        )?;
        if changed == 0 {
            return Err(StoreError::ScenarioNotFound(scenario_id));
        }
        Ok(())
    }

    /// Increments the play counters for one scenario.
    ///
    /// A single UPDATE statement performs the increment, so concurrent
    /// reveals of the same scenario cannot lose updates the way a
    /// read-modify-write would.
    pub fn record_play(&self, scenario_id: i64, is_correct: bool) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE scenarios
             SET times_played = times_played + 1,
                 correct_guesses = correct_guesses + ?1
             WHERE id = ?2",
            params![if is_correct { 1 } else { 0 }, scenario_id],
        )?;
        if changed == 0 {
            return Err(StoreError::ScenarioNotFound(scenario_id));
        }
        Ok(())
    }

    /// Appends one telemetry row to the play log.
    pub fn log_play(&self, record: &PlayRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO plays (session_id, scenario_id, choice, is_correct, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.session_id,
                record.scenario_id,
                record.choice.as_str(),
                record.is_correct,
                record.played_at,
            ],
        )?;
        Ok(())
    }

    // -- status ------------------------------------------------------------

    /// Row counts for the admin status endpoint.
    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let securities =
            self.conn
                .query_row("SELECT COUNT(*) FROM securities", [], |row| row.get(0))?;
        let scenarios =
            self.conn
                .query_row("SELECT COUNT(*) FROM scenarios", [], |row| row.get(0))?;
        let playable = self.conn.query_row(
            "SELECT COUNT(*) FROM scenarios WHERE label IN ('value', 'trap')",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreCounts {
            securities,
            scenarios,
            playable_scenarios: playable,
        })
    }
}

fn scenario_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Scenario> {
    let label: String = row.get(10)?;
    let difficulty: String = row.get(11)?;
    Ok(Scenario {
        id: Some(row.get(0)?),
        security_id: row.get(1)?,
        as_of: row.get(2)?,
        price_at_as_of: row.get(3)?,
        price_at_6mo: row.get(4)?,
        price_at_12mo: row.get(5)?,
        price_at_24mo: row.get(6)?,
        return_6mo: row.get(7)?,
        return_12mo: row.get(8)?,
        return_24mo: row.get(9)?,
        label: OutcomeLabel::parse(&label).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                10,
                format!("unknown outcome label: {}", label),
                rusqlite::types::Type::Text,
            )
        })?,
        difficulty: Difficulty::parse(&difficulty).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                11,
                format!("unknown difficulty: {}", difficulty),
                rusqlite::types::Type::Text,
            )
        })?,
        narrative: row.get(12)?,
        times_played: row.get(13)?,
        correct_guesses: row.get(14)?,
    })
}

/// Errors produced by the scenario store.
#[derive(Debug)]
pub enum StoreError {
    /// No scenario matched the requested filters
    NoPlayableScenario,
    /// Scenario id does not exist
    ScenarioNotFound(i64),
    /// Too few statements were knowable at the requested as-of date
    InsufficientHistory(PointInTimeError),
    /// Underlying SQLite error
    Sqlite(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoPlayableScenario => write!(f, "No playable scenario matches the filters"),
            StoreError::ScenarioNotFound(id) => write!(f, "Scenario {} not found", id),
            StoreError::InsufficientHistory(e) => write!(f, "{}", e),
            StoreError::Sqlite(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::InsufficientHistory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Sqlite(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::generator::generate_scenarios;
    use chrono::Duration;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_security(symbol: &str, masked: &str) -> Security {
        Security::new(
            symbol,
            format!("{} Incorporated", symbol),
            masked,
            Some("Technology".to_string()),
            Some("Software".to_string()),
            CapTier::Large,
        )
    }

    /// Daily bars compounding at `rate` per day. A constant daily rate keeps
    /// every 24-month forward return identical, so the label mix is known
    /// up front: 0.001/day doubles over 24 months (value, easy) and
    /// -0.001/day halves (trap, easy).
    fn daily_series(start: NaiveDate, days: i64, base: f64, rate: f64) -> Vec<PricePoint> {
        (0..days)
            .map(|i| {
                PricePoint::new(
                    start + Duration::days(i),
                    base * (1.0 + rate).powi(i as i32),
                    Some(500_000),
                )
            })
            .collect()
    }

    fn year_end_statement(fiscal_year: i32) -> StatementPeriod {
        let period_end = day(fiscal_year, 12, 31);
        StatementPeriod::new(
            fiscal_year,
            period_end,
            period_end + Duration::days(90),
            100.0 * fiscal_year as f64,
        )
    }

    #[test]
    fn test_schema_created_on_open() {
        let store = ScenarioStore::open_in_memory().unwrap();
        let count: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('securities','statements','price_history','scenarios','plays')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_upsert_security_insert_and_refresh() {
        let store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();

        // Refresh with new sector; masked name must survive the conflict
        let mut updated = test_security("AAPL", "Different Name");
        updated.sector = Some("Hardware".to_string());
        let id2 = store.upsert_security(&updated).unwrap();
        assert_eq!(id, id2);

        let stored = store.security_by_symbol("AAPL").unwrap().unwrap();
        assert_eq!(stored.sector.as_deref(), Some("Hardware"));
        assert_eq!(stored.masked_name, "Logic Prime");
    }

    #[test]
    fn test_append_price_points_idempotent() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();
        let points = daily_series(day(2020, 1, 1), 10, 100.0, 0.01);

        assert_eq!(store.append_price_points(id, &points).unwrap(), 10);
        assert_eq!(store.append_price_points(id, &points).unwrap(), 0);

        let stored = store.price_series(id, day(2020, 1, 1), day(2020, 1, 10)).unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored[0].adj_close, 100.0);
    }

    #[test]
    fn test_replace_statements_per_year() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();

        let statements: Vec<StatementPeriod> = (2012..=2018).map(year_end_statement).collect();
        store.replace_statements(id, &statements).unwrap();

        // Re-ingest a changed FY2018 row; the old value must be replaced
        // while the other years survive
        let mut revised = year_end_statement(2018);
        revised.revenue = 999.0;
        store.replace_statements(id, &[revised]).unwrap();

        let view = store
            .statement_view(id, day(2020, 1, 1), &PipelineConfig::default())
            .unwrap();
        assert_eq!(view.len(), 5);
        let fy2018 = view.iter().find(|s| s.fiscal_year == 2018).unwrap();
        assert_eq!(fy2018.revenue, 999.0);
        assert!(view.iter().any(|s| s.fiscal_year == 2017));
    }

    #[test]
    fn test_statement_view_applies_filter() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();
        let statements: Vec<StatementPeriod> = (2010..=2017).map(year_end_statement).collect();
        store.replace_statements(id, &statements).unwrap();

        let view = store
            .statement_view(id, day(2018, 1, 1), &PipelineConfig::default())
            .unwrap();
        // FY2017 becomes knowable 2018-03-31, so the window ends at FY2016
        assert_eq!(view.len(), 5);
        assert!(view.iter().all(|s| s.fiscal_year <= 2016));
    }

    #[test]
    fn test_statement_view_insufficient_history() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();
        store
            .replace_statements(id, &[year_end_statement(2016), year_end_statement(2017)])
            .unwrap();

        let result = store.statement_view(id, day(2019, 1, 1), &PipelineConfig::default());
        assert!(matches!(result, Err(StoreError::InsufficientHistory(_))));
    }

    #[test]
    fn test_upsert_scenarios_insert_or_ignore() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        let scenarios = generate_scenarios(id, &prices, &PipelineConfig::default());
        assert!(!scenarios.is_empty());

        let first = store.upsert_scenarios(&scenarios).unwrap();
        assert_eq!(first, scenarios.len());

        // Idempotent: a second run of the same batch inserts nothing
        let second = store.upsert_scenarios(&scenarios).unwrap();
        assert_eq!(second, 0);

        let counts = store.counts().unwrap();
        assert_eq!(counts.scenarios, scenarios.len() as i64);
    }

    #[test]
    fn test_upsert_never_overwrites_outcome() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("AAPL", "Logic Prime")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        let scenarios = generate_scenarios(id, &prices, &PipelineConfig::default());
        store.upsert_scenarios(&scenarios).unwrap();

        let stored = store
            .select_random_playable(&ScenarioFilter::default())
            .unwrap();
        store.record_play(stored.scenario.id.unwrap(), true).unwrap();

        // Upserting the batch again must not reset the play counters
        store.upsert_scenarios(&scenarios).unwrap();
        let reread = store.scenario(stored.scenario.id.unwrap()).unwrap();
        assert_eq!(reread.times_played, 1);
        assert_eq!(reread.correct_guesses, 1);
    }

    #[test]
    fn test_select_random_excludes_neutral() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("FLAT", "Steady Co")).unwrap();
        // Flat series: every outcome is neutral
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.0);
        let scenarios = generate_scenarios(id, &prices, &PipelineConfig::default());
        assert!(scenarios
            .iter()
            .all(|s| s.label == OutcomeLabel::Neutral));
        store.upsert_scenarios(&scenarios).unwrap();

        let result = store.select_random_playable(&ScenarioFilter::default());
        assert!(matches!(result, Err(StoreError::NoPlayableScenario)));
    }

    #[test]
    fn test_select_random_honors_filters() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();

        let hit = store
            .select_random_playable(&ScenarioFilter {
                difficulty: Some(Difficulty::Easy),
                sector: Some("Technology".to_string()),
                exclude_ids: Vec::new(),
            })
            .unwrap();
        assert_eq!(hit.scenario.difficulty, Difficulty::Easy);
        assert_eq!(hit.sector.as_deref(), Some("Technology"));

        let miss = store.select_random_playable(&ScenarioFilter {
            sector: Some("Utilities".to_string()),
            ..ScenarioFilter::default()
        });
        assert!(matches!(miss, Err(StoreError::NoPlayableScenario)));
    }

    #[test]
    fn test_exclude_ids_exhausts_pool() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();

        // Draw until the exclusion list covers the whole pool
        let mut seen = Vec::new();
        loop {
            match store.select_random_playable(&ScenarioFilter {
                exclude_ids: seen.clone(),
                ..ScenarioFilter::default()
            }) {
                Ok(playable) => {
                    let id = playable.scenario.id.unwrap();
                    assert!(!seen.contains(&id));
                    seen.push(id);
                }
                Err(StoreError::NoPlayableScenario) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_inactive_security_not_served() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();

        assert!(store.deactivate_security("GROW").unwrap());
        let result = store.select_random_playable(&ScenarioFilter::default());
        assert!(matches!(result, Err(StoreError::NoPlayableScenario)));

        // The reveal path still resolves for players mid-game
        let counts = store.counts().unwrap();
        assert!(counts.playable_scenarios > 0);
    }

    #[test]
    fn test_record_play_increments() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();
        let scenario_id = store
            .select_random_playable(&ScenarioFilter::default())
            .unwrap()
            .scenario
            .id
            .unwrap();

        store.record_play(scenario_id, true).unwrap();
        store.record_play(scenario_id, false).unwrap();
        store.record_play(scenario_id, true).unwrap();

        let scenario = store.scenario(scenario_id).unwrap();
        assert_eq!(scenario.times_played, 3);
        assert_eq!(scenario.correct_guesses, 2);
    }

    #[test]
    fn test_record_play_unknown_scenario() {
        let store = ScenarioStore::open_in_memory().unwrap();
        let result = store.record_play(4242, true);
        assert!(matches!(result, Err(StoreError::ScenarioNotFound(4242))));
    }

    #[test]
    fn test_reveal_lookup_exposes_real_identity() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();
        let scenario_id = store
            .select_random_playable(&ScenarioFilter::default())
            .unwrap()
            .scenario
            .id
            .unwrap();

        let reveal = store.reveal_lookup(scenario_id).unwrap();
        assert_eq!(reveal.symbol, "GROW");
        assert_eq!(reveal.company_name, "GROW Incorporated");
    }

    #[test]
    fn test_attach_narrative() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();
        let scenario_id = store
            .select_random_playable(&ScenarioFilter::default())
            .unwrap()
            .scenario
            .id
            .unwrap();

        store
            .attach_narrative(scenario_id, "A mid-cap with widening margins.")
            .unwrap();
        let scenario = store.scenario(scenario_id).unwrap();
        assert_eq!(
            scenario.narrative.as_deref(),
            Some("A mid-cap with widening margins.")
        );
    }

    #[test]
    fn test_log_play_appends() {
        let mut store = ScenarioStore::open_in_memory().unwrap();
        let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
        let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
        store
            .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
            .unwrap();
        let scenario_id = store
            .select_random_playable(&ScenarioFilter::default())
            .unwrap()
            .scenario
            .id
            .unwrap();

        let record = PlayRecord {
            session_id: "session-1".to_string(),
            scenario_id,
            choice: crate::scenario::PlayerChoice::Value,
            is_correct: true,
            played_at: chrono::Utc::now(),
        };
        store.log_play(&record).unwrap();
        store.log_play(&record).unwrap();

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM plays", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_concurrent_record_play_counts_every_reveal() {
        // N threads each open the shared file and reveal the same scenario.
        // The single-statement increment must count all of them.
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("scenarios.db");

        let scenario_id = {
            let mut store = ScenarioStore::open(&db_path).unwrap();
            let id = store.upsert_security(&test_security("GROW", "Sync Apex")).unwrap();
            let prices = daily_series(day(2013, 1, 1), 9 * 365, 100.0, 0.001);
            store
                .upsert_scenarios(&generate_scenarios(id, &prices, &PipelineConfig::default()))
                .unwrap();
            store
                .select_random_playable(&ScenarioFilter::default())
                .unwrap()
                .scenario
                .id
                .unwrap()
        };

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let path = db_path.clone();
                std::thread::spawn(move || {
                    let store = ScenarioStore::open(path).unwrap();
                    for _ in 0..5 {
                        store.record_play(scenario_id, false).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let store = ScenarioStore::open(&db_path).unwrap();
        let scenario = store.scenario(scenario_id).unwrap();
        assert_eq!(scenario.times_played, 40);
        assert_eq!(scenario.correct_guesses, 0);
    }
}
