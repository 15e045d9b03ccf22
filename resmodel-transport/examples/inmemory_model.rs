use async_trait::async_trait;
use resmodel_domain::http::{HttpMethod, Request, Response, Routes};
use resmodel_domain::mutation::{Mutation, Mutations};
use resmodel_domain::validation::{ValidationRules, rules};
use resmodel_domain::{Attributes, Model, ModelDefinition, ModelError};
use resmodel_transport::InMemoryTransport;
use serde_json::{Value, json};
use std::sync::Arc;

struct Contact;

#[async_trait]
impl ModelDefinition for Contact {
    const TYPE: &'static str = "Contact";

    fn defaults(&self) -> Attributes {
        let mut defaults = Attributes::new();
        defaults.insert("id".into(), Value::Null);
        defaults.insert("name".into(), json!(""));
        defaults.insert("email".into(), json!(""));
        defaults
    }

    fn mutations(&self) -> Mutations {
        Mutations::new().with(
            "email",
            Mutation::one(|value| match value {
                Value::String(s) => Value::String(s.trim().to_lowercase()),
                other => other,
            }),
        )
    }

    fn validation(&self) -> ValidationRules {
        ValidationRules::new()
            .with("name", [rules::required()])
            .with("email", [rules::required(), rules::email()])
    }

    fn routes(&self) -> Routes {
        Routes::new()
            .with("create", "/contacts")
            .with("update", "/contacts/:id")
            .with("delete", "/contacts/:id")
    }

    fn on_save_success(&self, model: &Model<Self>, response: &Response) {
        if let Some(Value::Object(body)) = response.body() {
            model.assign(body.clone());
        }
        println!("saved: {}", model.to_json());
    }

    fn on_response_error(&self, model: &Model<Self>, error: &ModelError) {
        println!("request failed: {}", model.response_error_message(error));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let transport = Arc::new(InMemoryTransport::new());
    transport.route(HttpMethod::Post, "/contacts", |request: Request| async move {
        let mut body = request.data().as_json().cloned().unwrap_or(Value::Null);
        body["id"] = json!(42);
        Response::json(201, body)
    });
    transport.respond(
        HttpMethod::Put,
        "/contacts/42",
        503,
        json!({ "message": "maintenance window" }),
    );

    let contact = Model::new(Contact, transport.clone(), Attributes::new());
    contact.set("name", "Ada");
    contact.set("email", "  ADA@Example.COM ");

    // 保存前可单独校验，保存时也会再次校验
    if !contact.validate().await {
        println!("errors: {:?}", contact.errors());
    }

    contact.save().await?;
    println!("is_new after create: {}", contact.is_new());

    contact.set("name", "Ada Lovelace");
    println!("changed: {:?}", contact.changed());
    if let Err(err) = contact.save().await {
        println!("update failed: {err}; fatal={}", contact.status().fatal);
    }

    contact.reset();
    println!("after reset: {}", contact.to_json());
    println!("requests sent: {}", transport.requests().len());
    Ok(())
}
