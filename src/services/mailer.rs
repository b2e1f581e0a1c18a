// src/services/mailer.rs
//
// Costura com o canal de entrega. A integração real de e-mail/WhatsApp é um
// colaborador externo; aqui fica só o contrato e um stub que loga o envio.

use async_trait::async_trait;
use uuid::Uuid;

// Resultado da tentativa de entrega. Falha de entrega NÃO é AppError:
// o despacho marca o envio como `failed` e segue para o próximo destinatário.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> DeliveryOutcome;
}

// Stub de produção: registra no log e considera entregue.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> DeliveryOutcome {
        let message_id = Uuid::new_v4().to_string();
        tracing::info!("📧 E-mail de campanha para {} ({}): {}", to, subject, message_id);
        DeliveryOutcome::delivered(message_id)
    }
}

// Monta o HTML do e-mail de campanha: link de clique e pixel de abertura 1x1,
// ambos chaveados pelo token de rastreio.
pub fn build_campaign_email_html(
    message: &str,
    click_url: &str,
    open_url: &str,
    image_url: Option<&str>,
) -> String {
    let header_img = match image_url {
        Some(url) => format!(
            r#"<img src="{url}" alt="Campanha" style="max-width: 100%; height: auto; margin-bottom: 20px;">"#
        ),
        None => String::new(),
    };
    let body = message.replace('\n', "<br>");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  {header_img}
  <div style="margin-bottom: 30px;">{body}</div>
  <a href="{click_url}" style="display: inline-block; background-color: #007bff; color: white; padding: 12px 30px; text-decoration: none; border-radius: 5px; font-weight: bold;">Clique Aqui</a>
  <img src="{open_url}" alt="" width="1" height="1" style="display: block; margin-top: 20px;">
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_embute_links_de_rastreio() {
        let html = build_campaign_email_html(
            "Oferta especial\npara você",
            "http://localhost:3000/t/c/abc",
            "http://localhost:3000/t/o/abc",
            None,
        );
        assert!(html.contains("http://localhost:3000/t/c/abc"));
        assert!(html.contains("http://localhost:3000/t/o/abc"));
        assert!(html.contains("Oferta especial<br>para você"));
        assert!(!html.contains("<img src=\"\""));
    }
}
