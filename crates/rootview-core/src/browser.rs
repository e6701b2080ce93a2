//! A browsing session bound to one root directory.
//!
//! [`Browser`] ties the pieces together: every request path goes through
//! the resolver before it reaches the lister, the entry operations or the
//! thumbnail cache. Browsers share no state, so several with different
//! roots can live in one process.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::catalog::{Catalog, EntryType, HiddenNames, TypeTable};
use crate::config::{expand_home, Config};
use crate::error::{CoreError, CoreResult};
use crate::fs::listing::{list_directory, Listing};
use crate::fs::ops::{self, EntryDetails};
use crate::fs::resolve::{resolve, resolve_child, resolve_entry, ResolvedPath, Root};
use crate::thumbnail::{Thumbnail, ThumbnailCache};

#[derive(Debug)]
pub struct Browser {
    root: Root,
    catalog: RwLock<Arc<Catalog>>,
    thumbnails: ThumbnailCache,
    max_image_previews: usize,
}

impl Browser {
    /// Builds a browser from a validated configuration.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`] if the configuration is inconsistent.
    /// - [`CoreError::NotFound`] / [`CoreError::NotADirectory`] if the root
    ///   is unusable (and `create_root` is off).
    /// - Any error opening the thumbnail cache directory.
    pub fn new(config: &Config) -> CoreResult<Self> {
        config.validate()?;

        let root_path = expand_home(&config.browse.root);
        if config.browse.create_root && !root_path.exists() {
            std::fs::create_dir_all(&root_path).map_err(|e| CoreError::from_io(&root_path, e))?;
            tracing::info!(root = %root_path.display(), "created root directory");
        }
        let root = Root::new(&root_path)?;
        let thumbnails = ThumbnailCache::open(&config.thumbnails)?;

        tracing::info!(root = %root.path().display(), "browser ready");
        Ok(Self::with_parts(
            root,
            config.catalog()?,
            thumbnails,
            config.browse.max_image_previews,
        ))
    }

    /// Assembles a browser from already-built parts.
    pub fn with_parts(
        root: Root,
        catalog: Catalog,
        thumbnails: ThumbnailCache,
        max_image_previews: usize,
    ) -> Self {
        Self {
            root,
            catalog: RwLock::new(Arc::new(catalog)),
            thumbnails,
            max_image_previews,
        }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Snapshot of the current catalog.
    pub fn catalog(&self) -> Arc<Catalog> {
        let guard = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the catalog. Listings already running keep the old one.
    pub fn reload_catalog(&self, types: TypeTable, hidden: HiddenNames) {
        let mut guard = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(Catalog::new(types, hidden));
        tracing::info!("catalog reloaded");
    }

    /// Rebuilds the catalog from `config`. The root and cache are unchanged.
    pub fn reload_from(&self, config: &Config) -> CoreResult<()> {
        let catalog = config.catalog()?;
        self.reload_catalog(catalog.types, catalog.hidden);
        Ok(())
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn max_image_previews(&self) -> usize {
        self.max_image_previews
    }

    pub fn resolve(&self, relative: &str) -> CoreResult<ResolvedPath> {
        resolve(&self.root, relative)
    }

    /// Resolves `relative` and lists it.
    pub fn list(&self, relative: &str) -> CoreResult<(ResolvedPath, Listing)> {
        let dir = self.resolve(relative)?;
        let listing = list_directory(dir.path(), &self.catalog())?;
        Ok((dir, listing))
    }

    pub fn classify(&self, name: &str, is_dir: bool) -> EntryType {
        self.catalog().types.classify(name, is_dir)
    }

    /// Resolves `relative` and returns its preview thumbnail.
    ///
    /// Resolution canonicalizes on the calling thread; async callers that
    /// must not block can [`resolve`](Self::resolve) off the runtime first
    /// and hand the path to [`ThumbnailCache::get_or_create`].
    pub async fn thumbnail(&self, relative: &str) -> CoreResult<Thumbnail> {
        let source = self.resolve(relative)?;
        Ok(self.thumbnails.get_or_create(source.path()).await?)
    }

    pub fn details(&self, relative: &str) -> CoreResult<EntryDetails> {
        let target = self.resolve(relative)?;
        ops::entry_details(target.path(), &self.catalog().types)
    }

    /// Creates folder `name` inside `parent`.
    pub fn create_folder(&self, parent: &str, name: &str) -> CoreResult<ResolvedPath> {
        let target = resolve_child(&self.root, parent, name)?;
        ops::create_folder(target.path())?;
        Ok(target)
    }

    /// Renames the entry at `relative` within its directory.
    pub fn rename(&self, relative: &str, new_name: &str) -> CoreResult<ResolvedPath> {
        let entry = resolve_entry(&self.root, relative)?;
        let parent = entry
            .relative()
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        // Validates the new name and refuses a symlink that would escape.
        let target = resolve_child(&self.root, &parent, new_name)?;
        ops::rename_entry(entry.path(), new_name)?;
        Ok(target)
    }

    /// Deletes the entry at `relative`. The root itself cannot be deleted.
    pub fn delete(&self, relative: &str) -> CoreResult<()> {
        let entry = resolve_entry(&self.root, relative)?;
        ops::delete_entry(entry.path())
    }

    /// Stores uploaded bytes in `dir` under a sanitized `file_name`.
    pub fn upload(&self, dir: &str, file_name: &str, bytes: &[u8]) -> CoreResult<ResolvedPath> {
        let name = ops::sanitize_file_name(file_name)?;
        let target = resolve_child(&self.root, dir, &name)?;
        let parent = target
            .path()
            .parent()
            .ok_or_else(|| CoreError::InvalidName(name.clone()))?;
        ops::save_upload(parent, &name, bytes)?;
        Ok(target)
    }

    /// Copies an external file or directory into `dir`.
    pub fn copy_in(&self, dir: &str, src: &Path, overwrite: bool) -> CoreResult<ResolvedPath> {
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::InvalidName(src.display().to_string()))?;
        let target = resolve_child(&self.root, dir, &name)?;
        let parent = target
            .path()
            .parent()
            .ok_or_else(|| CoreError::InvalidName(name.clone()))?;
        ops::copy_into(parent, src, overwrite)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThumbnailError;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config_for(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.browse.root = tmp.path().join("root");
        config.thumbnails.cache_dir = tmp.path().join("cache");
        config
    }

    fn setup() -> (TempDir, Browser) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("photos")).unwrap();
        fs::write(root.join("notes.txt"), "hello").unwrap();
        image::RgbImage::from_pixel(40, 20, image::Rgb([1, 2, 3]))
            .save(root.join("photos/cat.png"))
            .unwrap();
        let browser = Browser::new(&config_for(&tmp)).unwrap();
        (tmp, browser)
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = Browser::new(&config_for(&tmp)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn create_root_makes_directory() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_for(&tmp);
        config.browse.create_root = true;

        let browser = Browser::new(&config).unwrap();

        assert!(browser.root().path().is_dir());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("root")).unwrap();
        let mut config = config_for(&tmp);
        config.thumbnails.max_height = 0;

        assert!(matches!(Browser::new(&config), Err(CoreError::Config(_))));
    }

    #[test]
    fn list_root() {
        let (_tmp, browser) = setup();

        let (dir, listing) = browser.list("").unwrap();

        assert!(dir.is_root());
        let names: Vec<&str> = listing.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["photos", "notes.txt"]);
        assert_eq!(listing.total_size(), 5);
    }

    #[test]
    fn list_refuses_escape() {
        let (_tmp, browser) = setup();
        assert!(matches!(browser.list("../"), Err(CoreError::Containment(_))));
        assert!(matches!(browser.list("photos/../../"), Err(CoreError::Containment(_))));
    }

    #[test]
    fn list_file_is_not_a_directory() {
        let (_tmp, browser) = setup();
        assert!(matches!(browser.list("notes.txt"), Err(CoreError::NotADirectory(_))));
    }

    #[test]
    fn classify_uses_catalog() {
        let (_tmp, browser) = setup();
        assert_eq!(browser.classify("a.PNG", false), EntryType::Image);
        assert_eq!(browser.classify("a.PNG", true), EntryType::Folder);
    }

    #[test]
    fn reload_catalog_swaps_table() {
        let (_tmp, browser) = setup();
        let before = browser.catalog();

        browser.reload_catalog(TypeTable::default(), HiddenNames::new(["photos"]));

        let (_, listing) = browser.list("").unwrap();
        assert_eq!(listing.dir_count(), 0);
        assert!(!before.hidden.is_hidden("photos"));
    }

    #[test]
    fn reload_from_rejects_bad_config() {
        let (_tmp, browser) = setup();
        let config = Config::from_toml_str(
            "[[file_types]]\nkind = \"folder\"\nextensions = [\"x\"]\nicon = \"i\"\ncolor = \"c\"\n",
        )
        .unwrap();

        assert!(matches!(browser.reload_from(&config), Err(CoreError::Config(_))));
        assert_eq!(browser.classify("a.png", false), EntryType::Image);
    }

    #[tokio::test]
    async fn thumbnail_of_image() {
        let (_tmp, browser) = setup();

        let thumb = browser.thumbnail("photos/cat.png").await.unwrap();

        assert!(!thumb.data().is_empty());
        assert_eq!(browser.thumbnails().len(), 1);
    }

    #[tokio::test]
    async fn thumbnail_outside_root_is_refused() {
        let (tmp, browser) = setup();
        fs::write(tmp.path().join("outside.png"), "x").unwrap();

        let err = browser.thumbnail("../outside.png").await.unwrap_err();

        assert!(matches!(err, CoreError::Containment(_)));
    }

    #[tokio::test]
    async fn thumbnail_of_text_is_decode_error() {
        let (_tmp, browser) = setup();

        let err = browser.thumbnail("notes.txt").await.unwrap_err();

        assert!(matches!(err, CoreError::Thumbnail(ThumbnailError::Decode(_))));
        assert!(browser.thumbnails().is_empty());
    }

    #[test]
    fn create_rename_delete_round() {
        let (_tmp, browser) = setup();

        let created = browser.create_folder("photos", "2024").unwrap();
        assert_eq!(created.relative(), Path::new("photos/2024"));
        assert!(created.path().is_dir());

        let renamed = browser.rename("photos/2024", "archive").unwrap();
        assert_eq!(renamed.relative(), Path::new("photos/archive"));
        assert!(renamed.path().is_dir());
        assert!(!created.path().exists());

        browser.delete("photos/archive").unwrap();
        assert!(!renamed.path().exists());
    }

    #[test]
    fn create_existing_folder_conflicts() {
        let (_tmp, browser) = setup();
        assert!(matches!(
            browser.create_folder("", "photos"),
            Err(CoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn rename_rejects_bad_names() {
        let (_tmp, browser) = setup();
        for bad in ["", ".", "..", "a/b"] {
            assert!(
                matches!(browser.rename("notes.txt", bad), Err(CoreError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn root_cannot_be_deleted() {
        let (_tmp, browser) = setup();
        assert!(matches!(browser.delete(""), Err(CoreError::Containment(_))));
        assert!(matches!(browser.delete("/"), Err(CoreError::Containment(_))));
        assert!(browser.root().path().is_dir());
    }

    #[test]
    fn upload_sanitizes_name() {
        let (_tmp, browser) = setup();

        let saved = browser.upload("photos", "../../My Photo.png", b"data").unwrap();

        assert_eq!(saved.relative(), Path::new("photos/My_Photo.png"));
        assert_eq!(fs::read(saved.path()).unwrap(), b"data");
    }

    #[test]
    fn copy_in_brings_external_file() {
        let (tmp, browser) = setup();
        let external = tmp.path().join("report.pdf");
        fs::write(&external, "pdf").unwrap();

        let copied = browser.copy_in("", &external, false).unwrap();
        assert_eq!(copied.relative(), Path::new("report.pdf"));
        assert!(matches!(
            browser.copy_in("", &external, false),
            Err(CoreError::AlreadyExists(_))
        ));
        browser.copy_in("", &external, true).unwrap();
    }

    #[test]
    fn details_reports_kind() {
        let (_tmp, browser) = setup();

        let details = browser.details("photos/cat.png").unwrap();

        assert_eq!(details.name, "cat.png");
        assert_eq!(details.entry_type, EntryType::Image);
        assert!(!details.is_dir);
    }

    #[test]
    fn independent_browsers_coexist() {
        let (_a_tmp, a) = setup();
        let (_b_tmp, b) = setup();
        a.create_folder("", "only-in-a").unwrap();

        let (_, listing) = b.list("").unwrap();
        assert!(listing.entries().iter().all(|e| e.name() != "only-in-a"));
        assert_ne!(a.root().path(), b.root().path());
    }

    #[cfg(unix)]
    #[test]
    fn upload_through_escaping_symlink_is_refused() {
        let (tmp, browser) = setup();
        let outside: PathBuf = tmp.path().join("outside.txt");
        fs::write(&outside, "keep").unwrap();
        std::os::unix::fs::symlink(&outside, browser.root().path().join("trap.txt")).unwrap();

        let err = browser.upload("", "trap.txt", b"overwrite").unwrap_err();

        assert!(matches!(err, CoreError::Containment(_)));
        assert_eq!(fs::read_to_string(&outside).unwrap(), "keep");
    }

    #[cfg(unix)]
    #[test]
    fn delete_removes_link_pointing_outside() {
        let (tmp, browser) = setup();
        let outside: PathBuf = tmp.path().join("outside.txt");
        fs::write(&outside, "keep").unwrap();
        let link = browser.root().path().join("out.txt");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        browser.delete("out.txt").unwrap();

        assert!(fs::symlink_metadata(&link).is_err());
        assert_eq!(fs::read_to_string(&outside).unwrap(), "keep");
    }

    #[cfg(unix)]
    #[test]
    fn delete_removes_dangling_link() {
        let (_tmp, browser) = setup();
        let link = browser.root().path().join("dangling");
        std::os::unix::fs::symlink(browser.root().path().join("gone.txt"), &link).unwrap();

        browser.delete("dangling").unwrap();

        assert!(fs::symlink_metadata(&link).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rename_link_pointing_outside() {
        let (tmp, browser) = setup();
        let outside: PathBuf = tmp.path().join("outside.txt");
        fs::write(&outside, "keep").unwrap();
        std::os::unix::fs::symlink(&outside, browser.root().path().join("out.txt")).unwrap();

        let renamed = browser.rename("out.txt", "moved.txt").unwrap();

        assert_eq!(renamed.relative_display(), "moved.txt");
        let meta = fs::symlink_metadata(browser.root().path().join("moved.txt")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert!(fs::symlink_metadata(browser.root().path().join("out.txt")).is_err());
        assert_eq!(fs::read_to_string(&outside).unwrap(), "keep");
    }
}
