// src/services/cashback_service.rs
//
// Ledger de cashback. O saldo em cache da carteira é atualizado junto com
// cada lançamento, mas a decisão de gasto usa sempre `available_balance`,
// recalculado do ledger — um crédito válido ontem pode ter expirado hoje
// sem nenhum evento explícito de transição.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, locks::LockRegistry},
    models::cashback::{CashbackTransaction, CashbackWallet, TxDirection},
    store::{NewTransaction, TransactionLog, WalletStore},
};

#[derive(Debug, Clone)]
pub struct CreditInput {
    pub customer_id: Uuid,
    pub campaign_id: Uuid,
    pub amount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DebitInput {
    pub customer_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub amount: Decimal,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WalletInfo {
    pub wallet: CashbackWallet,
    pub available_balance: Decimal,
    pub transactions: Vec<CashbackTransaction>,
}

#[derive(Clone)]
pub struct CashbackService {
    wallets: Arc<dyn WalletStore>,
    ledger: Arc<dyn TransactionLog>,
    // Toda mutação de carteira do mesmo cliente é mutuamente exclusiva;
    // sem isso, dois débitos concorrentes passam na checagem de saldo
    // contra um valor defasado.
    locks: LockRegistry<Uuid>,
}

impl CashbackService {
    pub fn new(wallets: Arc<dyn WalletStore>, ledger: Arc<dyn TransactionLog>) -> Self {
        Self {
            wallets,
            ledger,
            locks: LockRegistry::new(),
        }
    }

    pub async fn get_or_create_wallet(
        &self,
        customer_id: Uuid,
    ) -> Result<CashbackWallet, AppError> {
        let lock = self.locks.lock_for(&customer_id);
        let _guard = lock.lock().await;
        self.ensure_wallet(customer_id).await
    }

    // Versão sem lock, para uso interno quando o lock do cliente já foi tomado.
    async fn ensure_wallet(&self, customer_id: Uuid) -> Result<CashbackWallet, AppError> {
        match self.wallets.find_by_customer(customer_id).await? {
            Some(wallet) => Ok(wallet),
            None => self.wallets.create(customer_id).await,
        }
    }

    pub async fn credit(&self, input: CreditInput) -> Result<CashbackTransaction, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(anyhow::anyhow!("crédito exige amount positivo").into());
        }

        let lock = self.locks.lock_for(&input.customer_id);
        let _guard = lock.lock().await;

        self.ensure_wallet(input.customer_id).await?;

        let tx = self
            .ledger
            .append(NewTransaction {
                customer_id: input.customer_id,
                campaign_id: Some(input.campaign_id),
                amount: input.amount,
                direction: TxDirection::Credit,
                expires_at: input.expires_at,
                used_at: None,
                reference: input.reference,
            })
            .await?;

        self.wallets.apply_delta(input.customer_id, input.amount).await?;

        tracing::debug!(
            "Crédito de cashback: cliente {} +{}",
            input.customer_id,
            input.amount
        );
        Ok(tx)
    }

    pub async fn debit(&self, input: DebitInput) -> Result<CashbackTransaction, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(anyhow::anyhow!("débito exige amount positivo").into());
        }

        let lock = self.locks.lock_for(&input.customer_id);
        let _guard = lock.lock().await;

        self.ensure_wallet(input.customer_id).await?;

        // Checagem e gravação sob o mesmo lock: nenhuma mutação acontece
        // se o saldo disponível não cobrir o valor.
        let now = Utc::now();
        let available = self.compute_available(input.customer_id, now).await?;
        if input.amount > available {
            return Err(AppError::InsufficientBalance);
        }

        let tx = self
            .ledger
            .append(NewTransaction {
                customer_id: input.customer_id,
                campaign_id: input.campaign_id,
                amount: input.amount,
                direction: TxDirection::Debit,
                expires_at: None,
                used_at: Some(now),
                reference: input.reference,
            })
            .await?;

        self.wallets.apply_delta(input.customer_id, -input.amount).await?;

        tracing::debug!(
            "Débito de cashback: cliente {} -{}",
            input.customer_id,
            input.amount
        );
        Ok(tx)
    }

    /// Saldo gastável agora: créditos não expirados menos todos os débitos,
    /// com piso em zero. O campo `balance` da carteira é informativo e pode
    /// incluir valor de créditos já vencidos.
    pub async fn available_balance(&self, customer_id: Uuid) -> Result<Decimal, AppError> {
        self.compute_available(customer_id, Utc::now()).await
    }

    async fn compute_available(
        &self,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let credits = self.ledger.sum_valid_credits(customer_id, now).await?;
        let debits = self.ledger.sum_debits(customer_id).await?;
        Ok((credits - debits).max(Decimal::ZERO))
    }

    pub async fn wallet_info(&self, customer_id: Uuid) -> Result<WalletInfo, AppError> {
        let wallet = self.get_or_create_wallet(customer_id).await?;
        let available_balance = self.available_balance(customer_id).await?;
        let transactions = self.ledger.recent_by_customer(customer_id, 50).await?;
        Ok(WalletInfo {
            wallet,
            available_balance,
            transactions,
        })
    }
}
