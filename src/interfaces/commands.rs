use super::csv::command_reader::{CommandKind, CommandRecord};
use crate::application::engine::Ledger;
use crate::domain::loan::LoanId;
use crate::domain::session::Session;
use crate::error::{LedgerError, Result};
use std::collections::HashMap;
use tracing::info;

/// Applies command rows to a [`Ledger`], resolving loan labels to ids.
pub struct CommandProcessor<'a> {
    ledger: &'a Ledger,
    loans: HashMap<String, LoanId>,
}

fn required<T>(value: Option<T>, command: CommandKind, column: &str) -> Result<T> {
    value.ok_or_else(|| {
        LedgerError::ValidationError(format!("{command:?} requires the `{column}` column"))
    })
}

impl<'a> CommandProcessor<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            loans: HashMap::new(),
        }
    }

    fn loan_id(&self, label: Option<String>, command: CommandKind) -> Result<LoanId> {
        let label = required(label, command, "loan")?;
        self.loans
            .get(&label)
            .copied()
            .ok_or_else(|| LedgerError::not_found("Loan", label))
    }

    async fn session(&self, actor: &str) -> Result<Session> {
        self.ledger.open_session(actor).await
    }

    pub async fn apply(&mut self, record: CommandRecord) -> Result<()> {
        let command = record.command;
        match command {
            CommandKind::Register => {
                let name = required(record.target, command, "target")?;
                let group = required(record.group, command, "group")?;
                self.ledger.register(&name, &record.actor, group).await?;
            }
            CommandKind::Transfer => {
                let session = self.session(&record.actor).await?;
                let recipient = required(record.target, command, "target")?;
                let amount = required(record.amount, command, "amount")?;
                self.ledger.transfer(&session, &recipient, amount).await?;
            }
            CommandKind::RequestLoan => {
                let session = self.session(&record.actor).await?;
                let label = required(record.loan, command, "loan")?;
                if self.loans.contains_key(&label) {
                    return Err(LedgerError::ValidationError(format!(
                        "Loan label `{label}` is already in use"
                    )));
                }
                let loan = self
                    .ledger
                    .request_loan(
                        &session,
                        required(record.amount, command, "amount")?,
                        required(record.term_days, command, "term_days")?,
                        required(record.installments, command, "installments")?,
                    )
                    .await?;
                info!(label = %label, loan = %loan.id, "loan label bound");
                self.loans.insert(label, loan.id);
            }
            CommandKind::Approve => {
                let session = self.session(&record.actor).await?;
                let id = self.loan_id(record.loan, command)?;
                self.ledger.approve_loan(&session, id).await?;
            }
            CommandKind::Reject => {
                let session = self.session(&record.actor).await?;
                let id = self.loan_id(record.loan, command)?;
                self.ledger.reject_loan(&session, id).await?;
            }
            CommandKind::Adjust => {
                let session = self.session(&record.actor).await?;
                let target = required(record.target, command, "target")?;
                let amount = required(record.amount, command, "amount")?;
                self.ledger.adjust_balance(&session, &target, amount).await?;
            }
        }
        Ok(())
    }
}
