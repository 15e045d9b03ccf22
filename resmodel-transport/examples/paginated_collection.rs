use resmodel_domain::http::{HttpMethod, Request, Response, Routes};
use resmodel_domain::{Collection, CollectionDefinition, CollectionOptions, ModelDefinition};
use resmodel_transport::InMemoryTransport;
use serde_json::{Value, json};
use std::sync::Arc;

const PER_PAGE: usize = 2;

struct Photo;

impl ModelDefinition for Photo {
    const TYPE: &'static str = "Photo";
}

struct Album;

impl CollectionDefinition for Album {
    const TYPE: &'static str = "Album";
    type Model = Photo;

    fn model(&self) -> Photo {
        Photo
    }

    fn routes(&self) -> Routes {
        Routes::new()
            .with("fetch", "/albums/:album/photos")
            .with("delete", "/albums/:album/photos")
    }

    fn options(&self) -> CollectionOptions {
        CollectionOptions {
            use_delete_body: false,
            ..CollectionOptions::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let photos: Vec<Value> = (1..=5)
        .map(|id| json!({ "id": id, "title": format!("photo #{id}") }))
        .collect();

    let transport = Arc::new(InMemoryTransport::new());
    transport.route(HttpMethod::Get, "/albums/3/photos", move |request: Request| {
        let photos = photos.clone();
        async move {
            let page = request
                .params()
                .get("page")
                .and_then(Value::as_u64)
                .unwrap_or(1) as usize;
            let items: Vec<Value> = photos
                .into_iter()
                .skip((page - 1) * PER_PAGE)
                .take(PER_PAGE)
                .collect();
            Response::json(200, json!({ "data": items }))
        }
    });
    transport.route(HttpMethod::Delete, "/albums/3/photos", |request: Request| async move {
        println!("delete ids: {:?}", request.params().get("id"));
        Response::json(200, json!({}))
    });

    let album = Collection::new(Album, transport.clone());
    album.set("album", 3);
    album.page(Some(1));

    // 逐页拉取，直到遇到空页
    while !album.is_last_page() {
        album.fetch().await?;
        println!("loaded {} photos, next page {:?}", album.len(), album.get_page());
    }

    album.delete().await?;
    println!("remaining after delete: {}", album.len());
    Ok(())
}
