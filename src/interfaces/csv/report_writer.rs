use crate::domain::account::Account;
use crate::domain::interest::LoanTerms;
use crate::domain::loan::Loan;
use crate::domain::money::Balance;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow<'a> {
    email: &'a str,
    name: &'a str,
    group: u8,
    admin: bool,
    balance: String,
    transactions: usize,
}

#[derive(Serialize)]
struct GroupRow {
    group: u8,
    total: String,
}

#[derive(Serialize)]
struct LoanRow {
    loan: String,
    account: String,
    principal: String,
    term_days: u32,
    installments: u32,
    status: &'static str,
    total: String,
    installment: String,
}

/// Writes CSV reports. Amounts are rounded to cents here and nowhere else.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

fn cents(value: rust_decimal::Decimal) -> String {
    value.round_dp(2).normalize().to_string()
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[Account]) -> Result<()> {
        for account in accounts {
            self.writer.serialize(AccountRow {
                email: &account.email,
                name: &account.name,
                group: account.group.value(),
                admin: account.is_admin,
                balance: account.balance.to_string(),
                transactions: account.transactions.len(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_group_totals(&mut self, totals: &BTreeMap<u8, Balance>) -> Result<()> {
        for (group, total) in totals {
            self.writer.serialize(GroupRow {
                group: *group,
                total: total.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_loans(&mut self, loans: &[(Loan, LoanTerms)]) -> Result<()> {
        for (loan, terms) in loans {
            self.writer.serialize(LoanRow {
                loan: loan.id.to_string(),
                account: loan.account_id.to_string(),
                principal: loan.principal.to_string(),
                term_days: loan.term.days(),
                installments: loan.installments.count(),
                status: loan.status.as_str(),
                total: cents(terms.total_amount),
                installment: cents(terms.installment_amount),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
