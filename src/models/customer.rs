// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Cliente final importado pelo módulo de listas (colaborador externo).
// O núcleo só lê este diretório para resolver destinatários de envio.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EndCustomer {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
