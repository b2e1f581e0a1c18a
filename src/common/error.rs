// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
//
// Duas famílias distintas: regras de negócio (resultados esperados, viram 4xx
// com um motivo estável legível por máquina) e falhas de sistema (viram 500 e
// vão para o log). Quem chama distingue pelo variant, sem depender de
// hierarquia de exceções.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Não encontrado ---
    #[error("Campanha não encontrada")]
    CampaignNotFound,

    #[error("Cliente não encontrado")]
    CustomerNotFound,

    #[error("Cupom não encontrado")]
    CouponNotFound,

    // --- Regras de negócio ---
    #[error("Campanha expirada")]
    CampaignExpired,

    #[error("Cupom já resgatado")]
    CouponAlreadyRedeemed,

    #[error("Limite de usos do cupom atingido")]
    CouponLimitReached,

    #[error("Cupom atribuído a outro cliente")]
    CouponNotAssignedToCustomer,

    #[error("Saldo de cashback insuficiente")]
    InsufficientBalance,

    // --- Falhas de sistema ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    // Motivo estável exposto no corpo JSON; os clientes fazem branch nisso.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::CampaignNotFound => "campaign_not_found",
            AppError::CustomerNotFound => "customer_not_found",
            AppError::CouponNotFound => "coupon_not_found",
            AppError::CampaignExpired => "campaign_expired",
            AppError::CouponAlreadyRedeemed => "coupon_already_redeemed",
            AppError::CouponLimitReached => "coupon_limit_reached",
            AppError::CouponNotAssignedToCustomer => "coupon_not_assigned_to_customer",
            AppError::InsufficientBalance => "insufficient_balance",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            AppError::CampaignExpired
                | AppError::CouponAlreadyRedeemed
                | AppError::CouponLimitReached
                | AppError::CouponNotAssignedToCustomer
                | AppError::InsufficientBalance
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::ValidationError(ref errors) => {
                // Retorna todos os detalhes da validação, campo a campo.
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": self.reason(),
                    "message": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::CampaignNotFound
            | AppError::CustomerNotFound
            | AppError::CouponNotFound => StatusCode::NOT_FOUND,

            AppError::CampaignExpired
            | AppError::CouponLimitReached
            | AppError::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CouponAlreadyRedeemed => StatusCode::CONFLICT,
            AppError::CouponNotAssignedToCustomer => StatusCode::FORBIDDEN,

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro interno do servidor: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.reason(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motivos_sao_estaveis() {
        assert_eq!(AppError::CouponAlreadyRedeemed.reason(), "coupon_already_redeemed");
        assert_eq!(AppError::InsufficientBalance.reason(), "insufficient_balance");
        assert_eq!(AppError::CampaignExpired.reason(), "campaign_expired");
    }

    #[test]
    fn regra_de_negocio_distinta_de_falha_de_sistema() {
        assert!(AppError::InsufficientBalance.is_business_rule());
        assert!(!AppError::CouponNotFound.is_business_rule());
        assert!(!AppError::InternalServerError(anyhow::anyhow!("x")).is_business_rule());
    }
}
