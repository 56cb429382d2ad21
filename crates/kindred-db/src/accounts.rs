use anyhow::Result;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use kindred_types::models::{Account, RelationshipStatus};

use crate::models::{CodeOutcome, PairOutcome, PatchupOutcome};
use crate::{Database, format_ts, parse_ts};

const ACCOUNT_COLUMNS: &str = "email, name, pin_hash, pair_code, paired_with, is_paired, \
     relationship_status, breakup_reason, patch_requested, created_at";

impl Database {
    /// Returns `false` when the email is already registered.
    pub fn create_account(&self, email: &str, name: &str, pin_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO accounts (email, name, pin_hash, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(email) DO NOTHING",
                (email, name, pin_hash, format_ts(&Utc::now())),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_account(&self, email: &str) -> Result<Option<Account>> {
        self.with_conn(|conn| query_account(conn, email))
    }

    pub fn pair_code_in_use(&self, code: &str) -> Result<bool> {
        self.with_conn(|conn| code_taken(conn, code))
    }

    /// Store a freshly generated code on an account that is still unpaired.
    /// The uniqueness check and the write share one transaction.
    pub fn set_pair_code(&self, email: &str, code: &str) -> Result<CodeOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if code_taken(&tx, code)? {
                return Ok(CodeOutcome::InUse);
            }
            let updated = tx.execute(
                "UPDATE accounts SET pair_code = ?2 WHERE email = ?1 AND is_paired = 0",
                (email, code),
            )?;
            if updated == 0 {
                return Ok(match query_account(&tx, email)? {
                    Some(_) => CodeOutcome::AlreadyPaired,
                    None => CodeOutcome::AccountMissing,
                });
            }
            tx.commit()?;

            Ok(CodeOutcome::Assigned)
        })
    }

    /// Pair `email` with the unpaired account holding `code`. Both sides are
    /// updated in one transaction; the joiner adopts the code.
    pub fn pair_with_code(&self, email: &str, code: &str) -> Result<PairOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(account) = query_account(&tx, email)? else {
                return Ok(PairOutcome::AccountMissing);
            };
            if account.is_paired {
                return Ok(PairOutcome::AlreadyPaired);
            }

            let partner: Option<String> = tx
                .query_row(
                    "SELECT email FROM accounts
                     WHERE pair_code = ?1 AND is_paired = 0 AND email != ?2
                     LIMIT 1",
                    (code, email),
                    |r| r.get(0),
                )
                .optional()?;
            let Some(partner_email) = partner else {
                return Ok(PairOutcome::InvalidCode);
            };

            tx.execute(
                "UPDATE accounts SET paired_with = ?2, pair_code = ?3, is_paired = 1 WHERE email = ?1",
                (email, &partner_email, code),
            )?;
            tx.execute(
                "UPDATE accounts SET paired_with = ?2, is_paired = 1 WHERE email = ?1",
                (&partner_email, email),
            )?;
            tx.commit()?;

            Ok(PairOutcome::Paired { partner_email })
        })
    }

    /// Returns `true` only when the stored name actually changed.
    pub fn update_name(&self, email: &str, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE accounts SET name = ?2 WHERE email = ?1 AND name != ?2",
                (email, name),
            )?;
            Ok(updated == 1)
        })
    }

    pub fn update_pin_hash(&self, email: &str, pin_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET pin_hash = ?2 WHERE email = ?1",
                (email, pin_hash),
            )?;
            Ok(())
        })
    }

    /// Set the relationship status on both accounts of a pair.
    pub fn set_relationship_status(
        &self,
        email: &str,
        partner_email: &str,
        status: RelationshipStatus,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET relationship_status = ?3 WHERE email IN (?1, ?2)",
                (email, partner_email, status.as_str()),
            )?;
            Ok(())
        })
    }

    /// Put both accounts on a break with the given reason.
    pub fn record_breakup(&self, email: &str, partner_email: &str, reason: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET relationship_status = ?3, breakup_reason = ?4
                 WHERE email IN (?1, ?2)",
                (email, partner_email, RelationshipStatus::Break.as_str(), reason),
            )?;
            Ok(())
        })
    }

    /// Record a patch-up request. When the partner has already asked, both
    /// accounts return to active and the flags and reason are cleared.
    pub fn request_patchup(&self, email: &str) -> Result<PatchupOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(account) = query_account(&tx, email)? else {
                return Ok(PatchupOutcome::AccountMissing);
            };
            if account.relationship_status != RelationshipStatus::Break {
                return Ok(PatchupOutcome::NotOnBreak);
            }
            let Some(partner_email) = account.paired_with else {
                return Ok(PatchupOutcome::NoPartner);
            };
            let Some(partner) = query_account(&tx, &partner_email)? else {
                return Ok(PatchupOutcome::PartnerMissing);
            };

            tx.execute("UPDATE accounts SET patch_requested = 1 WHERE email = ?1", [email])?;

            let outcome = if partner.patch_requested {
                tx.execute(
                    "UPDATE accounts
                     SET relationship_status = ?3, patch_requested = 0, breakup_reason = NULL
                     WHERE email IN (?1, ?2)",
                    (email, &partner_email, RelationshipStatus::Active.as_str()),
                )?;
                PatchupOutcome::Completed
            } else {
                PatchupOutcome::Waiting
            };

            tx.commit()?;
            Ok(outcome)
        })
    }
}

fn code_taken(conn: &Connection, code: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM accounts WHERE pair_code = ?1 LIMIT 1", [code], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn query_account(conn: &Connection, email: &str) -> Result<Option<Account>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"))?;
    let account = stmt.query_row([email], account_from_row).optional()?;
    Ok(account)
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let status: String = row.get(6)?;
    let created_at: String = row.get(9)?;

    Ok(Account {
        email: row.get(0)?,
        name: row.get(1)?,
        pin_hash: row.get(2)?,
        pair_code: row.get(3)?,
        paired_with: row.get(4)?,
        is_paired: row.get(5)?,
        relationship_status: status
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        breakup_reason: row.get(7)?,
        patch_requested: row.get(8)?,
        created_at: parse_ts(9, &created_at)?,
    })
}
