use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frontmatter;
use crate::slug::{derive_slug, unique_slug};

const CONTENT_FILE: &str = "post.md";
const META_FILE: &str = "meta.json";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: PostMeta,
    pub content: String,
}

/// File-backed post storage. Every post is a folder under `root`:
///
/// ```text
/// <root>/<slug>/
///   post.md     # raw markdown, frontmatter-prefixed
///   meta.json   # { id, slug, title, createdAt, updatedAt }
///   images/
/// ```
///
/// There is no in-memory state; every operation re-reads the disk.
pub struct PostStore {
    root: PathBuf,
}

impl PostStore {
    pub fn new(root: PathBuf) -> Self {
        PostStore { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self, title: &str, content: &str) -> io::Result<Post> {
        fs::create_dir_all(&self.root)?;

        // Frontmatter wins over the caller for both slug and title
        let (fields, _) = frontmatter::parse(content);
        let candidate = match (fields.get("slug"), fields.get("title")) {
            (Some(slug), _) => derive_slug(slug),
            (None, Some(title)) => derive_slug(title),
            (None, None) => derive_slug(title),
        };
        let slug = unique_slug(&self.root, &candidate);
        let title = fields.get("title").unwrap_or(title).to_string();

        let now = Utc::now();
        let content = frontmatter::ensure(content, &title, &slug, now);

        let meta = PostMeta {
            id: slug.clone(),
            slug,
            title,
            created_at: now,
            updated_at: now,
        };

        let dir = self.root.join(&meta.slug);
        fs::create_dir_all(dir.join(IMAGES_DIR))?;
        fs::write(dir.join(CONTENT_FILE), &content)?;
        write_meta(&dir, &meta)?;

        Ok(Post { meta, content })
    }

    pub fn get(&self, id: &str) -> io::Result<Option<Post>> {
        let Some(dir) = self.post_dir(id) else {
            return Ok(None);
        };
        let Some(meta) = read_meta(&dir) else {
            return Ok(None);
        };

        let content = match fs::read_to_string(dir.join(CONTENT_FILE)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(Post { meta, content }))
    }

    pub fn list(&self) -> io::Result<Vec<PostMeta>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut posts = vec![];
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Folders without readable metadata are not posts
            if let Some(meta) = read_meta(&entry.path()) {
                posts.push(meta);
            }
        }

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    pub fn update(
        &self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> io::Result<Option<Post>> {
        let Some(existing) = self.get(id)? else {
            return Ok(None);
        };
        let dir = self.root.join(id);

        let mut meta = existing.meta;
        let mut content = match content {
            Some(content) => content.to_string(),
            None => existing.content,
        };

        if let Some(title) = title {
            meta.title = title.to_string();
            content = frontmatter::set_field(&content, "title", title);
        }

        meta.updated_at = Utc::now();
        let stamp = meta.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        content = frontmatter::set_field(&content, "updatedAt", &stamp);

        fs::write(dir.join(CONTENT_FILE), &content)?;
        write_meta(&dir, &meta)?;

        Ok(Some(Post { meta, content }))
    }

    pub fn delete(&self, id: &str) -> io::Result<bool> {
        let Some(dir) = self.post_dir(id) else {
            return Ok(false);
        };
        if !dir.is_dir() {
            return Ok(false);
        }

        fs::remove_dir_all(dir)?;
        Ok(true)
    }

    pub fn upload_image(&self, id: &str, bytes: &[u8], ext: &str) -> io::Result<Option<String>> {
        let Some(dir) = self.post_dir(id) else {
            return Ok(None);
        };
        if read_meta(&dir).is_none() {
            return Ok(None);
        }

        let images = dir.join(IMAGES_DIR);
        fs::create_dir_all(&images)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(images.join(&file_name), bytes)?;

        Ok(Some(format!("{}/{}/{}", IMAGES_DIR, id, file_name)))
    }

    pub fn list_images(&self, id: &str) -> io::Result<Vec<String>> {
        let Some(dir) = self.post_dir(id) else {
            return Ok(vec![]);
        };
        let images = dir.join(IMAGES_DIR);
        if !images.is_dir() {
            return Ok(vec![]);
        }

        let mut paths = vec![];
        for entry in fs::read_dir(images)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                paths.push(format!("{}/{}/{}", IMAGES_DIR, id, name));
            }
        }

        paths.sort();
        Ok(paths)
    }

    // Ids double as folder names; anything path-like never resolves.
    fn post_dir(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return None;
        }
        Some(self.root.join(id))
    }
}

fn write_meta(dir: &Path, meta: &PostMeta) -> io::Result<()> {
    let buf = serde_json::to_string_pretty(meta)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    fs::write(dir.join(META_FILE), buf)
}

fn read_meta(dir: &Path) -> Option<PostMeta> {
    let buf = fs::read_to_string(dir.join(META_FILE)).ok()?;
    serde_json::from_str(&buf).ok()
}
