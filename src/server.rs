use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};

use ntex::util::stream_recv;
use ntex::web;
use ntex_files::NamedFile;
use ntex_multipart::Multipart;
use serde::Deserialize;
use serde_json::json;
use spdlog::{info, warn};

use crate::assets;
use crate::config::Config;
use crate::post_store::PostStore;
use crate::render;

struct AppState {
    store: PostStore,
    public_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct CreatePostRequest {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct UpdatePostRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct RenderRequest {
    markdown: String,
}

fn bad_request(message: String) -> web::HttpResponse {
    web::HttpResponse::BadRequest().json(&json!({ "error": message }))
}

fn not_found(message: &str) -> web::HttpResponse {
    web::HttpResponse::NotFound().json(&json!({ "error": message }))
}

#[web::get("/health")]
async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().body("OK")
}

#[web::get("/api/posts")]
async fn list_posts(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    match state.store.list() {
        Ok(posts) => web::HttpResponse::Ok().json(&posts),
        Err(e) => {
            warn!("Error listing posts: {}", e);
            bad_request(format!("Error listing posts: {}", e))
        }
    }
}

#[web::get("/api/posts/{id}")]
async fn get_post(
    path: web::types::Path<String>,
    state: web::types::State<Arc<AppState>>,
) -> web::HttpResponse {
    let id = path.into_inner();
    match state.store.get(&id) {
        Ok(Some(post)) => web::HttpResponse::Ok().json(&post),
        Ok(None) => not_found("Post not found"),
        Err(e) => {
            warn!("Error reading post {}: {}", id, e);
            bad_request(format!("Error reading post: {}", e))
        }
    }
}

#[web::post("/api/posts")]
async fn create_post(body: String, state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    let req: CreatePostRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    match state.store.create(&req.title, &req.content) {
        Ok(post) => {
            info!("Created post {}", post.meta.id);
            web::HttpResponse::Created().json(&post)
        }
        Err(e) => {
            warn!("Error creating post: {}", e);
            bad_request(format!("Error creating post: {}", e))
        }
    }
}

#[web::put("/api/posts/{id}")]
async fn update_post(
    path: web::types::Path<String>,
    body: String,
    state: web::types::State<Arc<AppState>>,
) -> web::HttpResponse {
    let id = path.into_inner();
    let req: UpdatePostRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    match state.store.update(&id, req.title.as_deref(), req.content.as_deref()) {
        Ok(Some(post)) => web::HttpResponse::Ok().json(&post),
        Ok(None) => not_found("Post not found"),
        Err(e) => {
            warn!("Error updating post {}: {}", id, e);
            bad_request(format!("Error updating post: {}", e))
        }
    }
}

#[web::delete("/api/posts/{id}")]
async fn delete_post(
    path: web::types::Path<String>,
    state: web::types::State<Arc<AppState>>,
) -> web::HttpResponse {
    let id = path.into_inner();
    match state.store.delete(&id) {
        Ok(true) => {
            info!("Deleted post {}", id);
            web::HttpResponse::NoContent().finish()
        }
        Ok(false) => not_found("Post not found"),
        Err(e) => {
            warn!("Error deleting post {}: {}", id, e);
            bad_request(format!("Error deleting post: {}", e))
        }
    }
}

#[web::get("/api/posts/{id}/upload")]
async fn list_post_images(
    path: web::types::Path<String>,
    state: web::types::State<Arc<AppState>>,
) -> web::HttpResponse {
    let id = path.into_inner();
    match state.store.list_images(&id) {
        Ok(images) => web::HttpResponse::Ok().json(&json!({ "images": images })),
        Err(e) => {
            warn!("Error listing images for {}: {}", id, e);
            bad_request(format!("Error listing images: {}", e))
        }
    }
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[web::post("/api/posts/{id}/upload")]
async fn upload_image(
    path: web::types::Path<String>,
    mut payload: Multipart,
    state: web::types::State<Arc<AppState>>,
) -> web::HttpResponse {
    let id = path.into_inner();

    while let Some(item) = stream_recv(&mut payload).await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => return bad_request(format!("Invalid multipart payload: {}", e)),
        };

        let Some(ext) = image_extension(field.content_type().essence_str()) else {
            return bad_request(format!("Unsupported upload type: {}", field.content_type()));
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = stream_recv(&mut field).await {
            match chunk {
                Ok(data) => bytes.extend_from_slice(&data),
                Err(e) => return bad_request(format!("Error reading upload: {}", e)),
            }
        }

        return match state.store.upload_image(&id, &bytes, ext) {
            Ok(Some(image_path)) => {
                info!("Stored image {} for post {}", image_path, id);
                let markdown = format!("![]({})", image_path);
                web::HttpResponse::Created().json(&json!({
                    "path": image_path,
                    "markdown": markdown,
                }))
            }
            Ok(None) => bad_request(format!("Unknown post: {}", id)),
            Err(e) => {
                warn!("Error storing image for {}: {}", id, e);
                bad_request(format!("Error storing image: {}", e))
            }
        };
    }

    bad_request("No file in upload".to_string())
}

#[web::post("/api/render")]
async fn render_preview(body: String) -> web::HttpResponse {
    let req: RenderRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return bad_request(format!("Invalid request body: {}", e)),
    };

    match render::render(&req.markdown) {
        Ok(html) => web::HttpResponse::Ok().json(&json!({ "html": html })),
        Err(e) => bad_request(format!("Error rendering markdown: {}", e)),
    }
}

#[web::get("/images/{post}/{file}")]
async fn post_images(
    path: web::types::Path<(String, String)>,
    state: web::types::State<Arc<AppState>>,
) -> Result<NamedFile, web::Error> {
    let (post, file) = path.into_inner();
    if post.contains("../") || file.contains("../") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = state.store.root().join(post).join("images").join(file);
    if !file_path.is_file() {
        return Err(web::error::ErrorNotFound("Image not found").into());
    }

    Ok(NamedFile::open(file_path)?)
}

#[web::get("/")]
async fn index(state: web::types::State<Arc<AppState>>) -> web::HttpResponse {
    if let Some(ref public_dir) = state.public_dir {
        if let Ok(html) = fs::read_to_string(public_dir.join("index.html")) {
            return web::HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(html);
        }
    }

    web::HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(assets::EDITOR_HTML)
}

#[web::get("/{file}")]
async fn public_files(
    path: web::types::Path<String>,
    state: web::types::State<Arc<AppState>>,
) -> Result<NamedFile, web::Error> {
    let file = path.into_inner();
    if file.contains("../") {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let Some(ref public_dir) = state.public_dir else {
        return Err(web::error::ErrorNotFound("No such file").into());
    };

    let file_path = public_dir.join(file);
    if !file_path.is_file() {
        return Err(web::error::ErrorNotFound("No such file").into());
    }

    Ok(NamedFile::open(file_path)?)
}

pub async fn server_run(config: Config) -> io::Result<()> {
    let store = PostStore::new(config.paths.posts_dir.clone());

    info!("Serving posts from {}", config.paths.posts_dir.display());

    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;
    let app_state = Arc::new(AppState {
        store,
        public_dir: config.paths.public_dir.clone(),
    });

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .service(health)
            .service(list_posts)
            .service(create_post)
            .service(get_post)
            .service(update_post)
            .service(delete_post)
            .service(list_post_images)
            .service(upload_image)
            .service(render_preview)
            .service(post_images)
            .service(index)
            .service(public_files)
    })
    .bind((bind_addr, bind_port))?
    .run()
    .await
}
