use crate::{
    dto::contact::ContactRequest,
    error::{AppError, AppResult},
    mailer::OutgoingMail,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn send_contact_message(
    state: &AppState,
    payload: ContactRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let mail = compose(&payload)?;

    let mailer = state.mailer.clone();
    tokio::task::spawn_blocking(move || mailer.send(mail))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .map_err(AppError::Internal)?;

    Ok(ApiResponse::success(
        "Message sent",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn compose(payload: &ContactRequest) -> AppResult<OutgoingMail> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.message.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, email, and message are required".into(),
        ));
    }

    let subject = match payload.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(subject) => format!("Contact form: {subject}"),
        None => "New contact form submission".to_string(),
    };

    let mut body = format!("Name: {}\nEmail: {}\n", payload.name, payload.email);
    if let Some(phone) = payload.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        body.push_str(&format!("Phone: {phone}\n"));
    }
    body.push_str(&format!("\n{}\n", payload.message));

    Ok(OutgoingMail {
        reply_to: Some(payload.email.clone()),
        subject,
        body,
    })
}
