//! Layout bundles: a zip holding `<name>.json` plus `textures/`
//!
//! Export stages a self-contained copy of the layout in a scratch folder and
//! zips it. Import extracts into a scratch folder, picks the manifest and only
//! touches the store once the caller agreed to replace an existing layout.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::button::ButtonConfig;
use crate::config::layout::{is_valid_layout_name, LayoutConfig};
use crate::constants::paths::{BUNDLE_EXTENSION, LAYOUT_EXTENSION, TEXTURES_DIR};
use crate::error::{LayoutError, LayoutResult};
use crate::store::{manifest_file_name, write_atomically, LayoutStore};
use crate::textures::external_texture_path;

/// Result of `import`
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported(LayoutConfig),
    /// A layout with this name exists and the caller chose to keep it
    Declined { name: String },
}

/// Write `layout` and its custom textures to a zip at `dest`.
///
/// `dest` may be a directory, in which case the bundle is named after the
/// layout. Returns the path written.
pub fn export(store: &LayoutStore, layout: &LayoutConfig, dest: &Path) -> LayoutResult<PathBuf> {
    if !is_valid_layout_name(&layout.name) {
        return Err(LayoutError::InvalidName(layout.name.clone()));
    }

    let mut copy = layout.clone();
    copy.normalize();
    copy.validate()?;

    let dest = bundle_path(dest, &copy.name);
    let scratch = TempDir::new().map_err(|e| LayoutError::io(std::env::temp_dir(), e))?;
    let folder = scratch.path().join(&copy.name);
    let textures = folder.join(TEXTURES_DIR);
    fs::create_dir_all(&textures).map_err(|e| LayoutError::io(&textures, e))?;

    // source file -> name inside the bundle, and the reverse for collisions
    let mut bundled: HashMap<PathBuf, String> = HashMap::new();
    let mut taken: HashMap<String, PathBuf> = HashMap::new();
    for button in &copy.buttons {
        let owner = texture_owner(button, &copy.name);
        for relative in button.textures.external_paths() {
            let Some(source) = external_texture_path(store.root(), owner, relative) else {
                warn!(widget = %button.name, path = %relative, "Skipping texture outside the layout folder");
                continue;
            };
            if bundled.contains_key(&source) {
                continue;
            }
            if !source.is_file() {
                warn!(widget = %button.name, path = %source.display(), "Texture missing, leaving it out of the bundle");
                continue;
            }

            let file_name = unique_flat_name(relative, &taken);
            if file_name != flat_name(relative) {
                debug!(widget = %button.name, path = %relative, renamed = %file_name, "Texture file name already used in the bundle");
            }
            let target = textures.join(&file_name);
            fs::copy(&source, &target).map_err(|e| LayoutError::io(&source, e))?;
            taken.insert(file_name.clone(), source.clone());
            bundled.insert(source, file_name);
        }
    }

    let root = store.root().to_path_buf();
    let layout_name = copy.name.clone();
    for button in &mut copy.buttons {
        let owner = texture_owner(button, &layout_name).to_string();
        button.textures.map_external_paths(|relative| {
            external_texture_path(&root, &owner, relative)
                .and_then(|source| bundled.get(&source).cloned())
                .unwrap_or_else(|| flat_name(relative))
        });
    }
    let manifest = folder.join(manifest_file_name(&copy.name));
    fs::write(&manifest, copy.to_json()?).map_err(|e| LayoutError::io(&manifest, e))?;

    write_zip(&folder, &dest)?;
    info!(layout = %copy.name, path = %dest.display(), textures = bundled.len(), "Exported layout");
    Ok(dest)
}

/// Import a bundle, asking `confirm` before replacing a layout of the same name
pub fn import(
    store: &mut LayoutStore,
    archive: &Path,
    confirm: impl FnOnce(&str) -> bool,
) -> LayoutResult<ImportOutcome> {
    let staged = stage_import(archive)?;
    if staged.conflicts(store) && !confirm(staged.name()) {
        info!(layout = %staged.name(), "Import declined, keeping the existing layout");
        return Ok(ImportOutcome::Declined {
            name: staged.name().to_string(),
        });
    }
    staged.commit(store).map(ImportOutcome::Imported)
}

/// Extract a bundle to a scratch folder and find its manifest, without touching any store
pub fn stage_import(archive: &Path) -> LayoutResult<StagedImport> {
    let file = File::open(archive).map_err(|e| LayoutError::io(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| LayoutError::InvalidBundle {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;

    let scratch = TempDir::new().map_err(|e| LayoutError::io(std::env::temp_dir(), e))?;
    extract_regular_files(&mut zip, scratch.path(), archive)?;

    let (manifest, layout) = find_manifest(scratch.path())?.ok_or_else(|| LayoutError::InvalidBundle {
        path: archive.to_path_buf(),
        reason: "no valid layout manifest".to_string(),
    })?;
    debug!(archive = %archive.display(), manifest = %manifest.display(), layout = %layout.name, "Staged layout import");

    Ok(StagedImport {
        scratch,
        manifest,
        layout,
    })
}

/// An extracted bundle waiting to be installed. Dropping it discards the extraction.
#[derive(Debug)]
pub struct StagedImport {
    scratch: TempDir,
    manifest: PathBuf,
    layout: LayoutConfig,
}

impl StagedImport {
    pub fn name(&self) -> &str {
        &self.layout.name
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Whether installing would replace an existing layout
    pub fn conflicts(&self, store: &LayoutStore) -> bool {
        store.layout_dir(self.name()).exists()
    }

    /// Install into `store`, replacing any layout of the same name.
    ///
    /// The new folder is assembled next to the old one and swapped in, so a
    /// failure leaves the existing layout as it was.
    pub fn commit(self, store: &mut LayoutStore) -> LayoutResult<LayoutConfig> {
        let name = self.layout.name.clone();
        let root = store.root().to_path_buf();
        let manifest_dir = self.manifest.parent().unwrap_or(self.scratch.path());

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{name}.import-"))
            .tempdir_in(&root)
            .map_err(|e| LayoutError::io(&root, e))?;
        copy_tree(manifest_dir, staging.path(), &self.manifest)?;
        let textures = staging.path().join(TEXTURES_DIR);
        fs::create_dir_all(&textures).map_err(|e| LayoutError::io(&textures, e))?;
        for relative in self.layout.referenced_textures() {
            if external_texture_path(&root, &name, &relative).is_none() || !textures.join(&relative).is_file() {
                warn!(layout = %name, path = %relative, "Bundle does not contain a referenced texture");
            }
        }
        write_atomically(
            &staging.path().join(manifest_file_name(&name)),
            self.layout.to_json()?.as_bytes(),
        )?;

        let target = store.layout_dir(&name);
        let backup = root.join(format!(".{name}.backup"));
        let replacing = target.exists();
        if replacing {
            if backup.exists() {
                fs::remove_dir_all(&backup).map_err(|e| LayoutError::io(&backup, e))?;
            }
            fs::rename(&target, &backup).map_err(|e| LayoutError::io(&target, e))?;
        }

        if let Err(e) = fs::rename(staging.path(), &target) {
            if replacing {
                if let Err(undo) = fs::rename(&backup, &target) {
                    warn!(layout = %name, backup = %backup.display(), error = %undo, "Failed to restore layout after a failed import");
                }
            }
            return Err(LayoutError::io(&target, e));
        }
        if replacing {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!(path = %backup.display(), error = %e, "Failed to remove the replaced layout");
            }
        }

        info!(layout = %name, replaced = replacing, "Imported layout");
        store.load(&name)
    }
}

fn bundle_path(dest: &Path, name: &str) -> PathBuf {
    if dest.is_dir() {
        dest.join(format!("{name}.{BUNDLE_EXTENSION}"))
    } else {
        dest.to_path_buf()
    }
}

/// Layout whose `textures/` folder holds this widget's external files
fn texture_owner<'a>(button: &'a ButtonConfig, layout: &'a str) -> &'a str {
    if button.parent_layout.is_empty() {
        layout
    } else {
        button.parent_layout.as_str()
    }
}

/// File name of `relative`, suffixed `-1`, `-2`, ... while another file already uses it
fn unique_flat_name(relative: &str, taken: &HashMap<String, PathBuf>) -> String {
    let base = flat_name(relative);
    if !taken.contains_key(&base) {
        return base;
    }

    let path = Path::new(&base);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(&base);
    let extension = path.extension().and_then(|e| e.to_str());
    let mut n = 1;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn flat_name(relative: &str) -> String {
    Path::new(relative)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(relative)
        .to_string()
}

/// First layout manifest that parses, preferring one whose file stem matches its name
fn find_manifest(dir: &Path) -> LayoutResult<Option<(PathBuf, LayoutConfig)>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files).map_err(|e| LayoutError::io(dir, e))?;

    let mut fallback = None;
    for path in files {
        if path.extension().and_then(|e| e.to_str()) != Some(LAYOUT_EXTENSION) {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let json = fs::read_to_string(&path).map_err(|e| LayoutError::io(&path, e))?;
        let layout = match LayoutConfig::from_json(&stem, &json) {
            Ok(layout) => layout,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Not a layout manifest");
                continue;
            }
        };

        if layout.name == stem {
            return Ok(Some((path, layout)));
        }
        if fallback.is_none() {
            fallback = Some((path, layout));
        }
    }
    Ok(fallback)
}

/// Write the archive's regular files under `dest`.
///
/// Symlinks, special files and entries whose path escapes `dest` are skipped,
/// so nothing outside the archive is ever read.
fn extract_regular_files<R: Read + Seek>(zip: &mut ZipArchive<R>, dest: &Path, archive: &Path) -> LayoutResult<usize> {
    let archive_err = |source: zip::result::ZipError| LayoutError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(archive_err)?;
        if entry.is_dir() {
            continue;
        }
        if entry.is_symlink() {
            warn!(archive = %archive.display(), entry = %entry.name(), "Skipping symlink in bundle");
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(archive = %archive.display(), entry = %entry.name(), "Skipping bundle entry outside the archive root");
            continue;
        };

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| LayoutError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| LayoutError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| LayoutError::io(&target, e))?;
        written += 1;
    }
    debug!(archive = %archive.display(), files = written, "Extracted bundle");
    Ok(written)
}

/// All regular files under `dir`, sorted. Symlinks are not followed.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.path());
    for entry in entries {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, skip: &Path) -> LayoutResult<()> {
    let mut files = Vec::new();
    collect_files(from, &mut files).map_err(|e| LayoutError::io(from, e))?;
    for file in files {
        if file == skip {
            continue;
        }
        let Ok(relative) = file.strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| LayoutError::io(parent, e))?;
        }
        fs::copy(&file, &target).map_err(|e| LayoutError::io(&file, e))?;
    }
    Ok(())
}

fn write_zip(folder: &Path, dest: &Path) -> LayoutResult<()> {
    let archive_err = |source: zip::result::ZipError| LayoutError::Archive {
        path: dest.to_path_buf(),
        source,
    };

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| LayoutError::io(parent, e))?;

    let mut files = Vec::new();
    collect_files(folder, &mut files).map_err(|e| LayoutError::io(folder, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| LayoutError::io(parent, e))?;
    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for file in &files {
            let Ok(relative) = file.strip_prefix(folder) else {
                continue;
            };
            let entry: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            zip.start_file(entry.join("/"), options).map_err(archive_err)?;
            let mut source = File::open(file).map_err(|e| LayoutError::io(file, e))?;
            io::copy(&mut source, &mut zip).map_err(|e| LayoutError::io(file, e))?;
        }
        zip.finish().map_err(archive_err)?;
    }

    tmp.persist(dest).map_err(|e| LayoutError::io(dest, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::button::TextureSource;
    use crate::types::WidgetKind;
    use glam::Vec2;
    use std::io::Write;

    struct Fixture {
        dir: TempDir,
        store: LayoutStore,
    }

    fn fixture(root: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = LayoutStore::open(dir.path().join(root)).unwrap();
        Fixture { dir, store }
    }

    fn textured_layout(store: &mut LayoutStore, name: &str) -> LayoutConfig {
        let mut layout = LayoutConfig::new(name);
        layout.buttons.push(
            ButtonConfig::new("Ring", WidgetKind::Joystick, Vec2::new(200.0, 200.0), Vec2::splat(200.0)).with_textures(
                TextureSource::External {
                    texture: "ring.png".to_string(),
                    knob_texture: Some("knob.png".to_string()),
                },
            ),
        );
        layout.buttons.push(
            ButtonConfig::new("Fire", WidgetKind::Button, Vec2::new(400.0, 200.0), Vec2::splat(100.0))
                .with_textures(TextureSource::external("ring.png")),
        );
        layout.attach_buttons();
        store.save(&layout).unwrap();
        fs::write(store.textures_dir(name).join("ring.png"), b"ring-bytes").unwrap();
        fs::write(store.textures_dir(name).join("knob.png"), b"knob-bytes").unwrap();
        layout
    }

    fn zip_entries(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    fn write_test_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_export_then_import_into_empty_store() {
        let mut src = fixture("src");
        let layout = textured_layout(&mut src.store, "shared");
        let bundle = export(&src.store, &layout, src.dir.path()).unwrap();
        assert_eq!(bundle, src.dir.path().join("shared.zip"));
        assert_eq!(
            zip_entries(&bundle),
            vec!["shared.json", "textures/knob.png", "textures/ring.png"]
        );

        let mut dst = fixture("dst");
        let outcome = import(&mut dst.store, &bundle, |_| panic!("no conflict expected")).unwrap();
        let ImportOutcome::Imported(imported) = outcome else {
            panic!("expected import");
        };
        assert_eq!(imported, src.store.load("shared").unwrap());
        assert_eq!(fs::read(dst.store.textures_dir("shared").join("ring.png")).unwrap(), b"ring-bytes");
        assert!(dst.store.list().unwrap().contains(&"shared".to_string()));
    }

    #[test]
    fn test_export_flattens_and_skips_missing_textures() {
        let mut f = fixture("layouts");
        let mut layout = LayoutConfig::new("flat");
        layout.buttons.push(
            ButtonConfig::new("A", WidgetKind::Button, Vec2::ZERO, Vec2::splat(50.0))
                .with_textures(TextureSource::external("sub/a.png")),
        );
        layout.buttons.push(
            ButtonConfig::new("B", WidgetKind::Button, Vec2::ZERO, Vec2::splat(50.0))
                .with_textures(TextureSource::external("gone.png")),
        );
        layout.attach_buttons();
        f.store.save(&layout).unwrap();
        let sub = f.store.textures_dir("flat").join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("a.png"), b"a").unwrap();

        let bundle = export(&f.store, &layout, &f.dir.path().join("out.zip")).unwrap();
        assert_eq!(zip_entries(&bundle), vec!["flat.json", "textures/a.png"]);

        let staged = stage_import(&bundle).unwrap();
        assert_eq!(staged.layout().find("A").unwrap().textures, TextureSource::external("a.png"));
        assert_eq!(layout.find("A").unwrap().textures, TextureSource::external("sub/a.png"));
    }

    #[test]
    fn test_declined_import_leaves_store_untouched() {
        let mut f = fixture("layouts");
        let layout = textured_layout(&mut f.store, "clash");
        let bundle = export(&f.store, &layout, f.dir.path()).unwrap();

        let mut changed = layout.clone();
        changed.global_alpha = 0.5;
        f.store.save(&changed).unwrap();
        let before = fs::read(f.store.manifest_path("clash")).unwrap();

        let mut asked = None;
        let outcome = import(&mut f.store, &bundle, |name| {
            asked = Some(name.to_string());
            false
        })
        .unwrap();

        assert_eq!(outcome, ImportOutcome::Declined { name: "clash".to_string() });
        assert_eq!(asked.as_deref(), Some("clash"));
        assert_eq!(fs::read(f.store.manifest_path("clash")).unwrap(), before);
    }

    #[test]
    fn test_confirmed_import_replaces_layout() {
        let mut f = fixture("layouts");
        let layout = textured_layout(&mut f.store, "clash");
        let bundle = export(&f.store, &layout, f.dir.path()).unwrap();

        let mut changed = layout.clone();
        changed.global_alpha = 0.5;
        f.store.save(&changed).unwrap();
        fs::write(f.store.textures_dir("clash").join("stale.png"), b"old").unwrap();

        let outcome = import(&mut f.store, &bundle, |_| true).unwrap();
        let ImportOutcome::Imported(imported) = outcome else {
            panic!("expected import");
        };
        assert_eq!(imported.global_alpha, layout.global_alpha);
        assert!(!f.store.textures_dir("clash").join("stale.png").exists());

        let leftovers: Vec<_> = fs::read_dir(f.store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn test_bundle_without_manifest_is_invalid() {
        let f = fixture("layouts");
        let path = f.dir.path().join("empty.zip");
        write_test_zip(&path, &[("textures/a.png", b"a"), ("notes.json", b"{\"hello\": 1}")]);

        assert!(matches!(stage_import(&path), Err(LayoutError::InvalidBundle { .. })));
    }

    #[test]
    fn test_non_zip_file_is_invalid() {
        let f = fixture("layouts");
        let path = f.dir.path().join("fake.zip");
        fs::write(&path, b"not a zip").unwrap();

        assert!(matches!(stage_import(&path), Err(LayoutError::InvalidBundle { .. })));
    }

    #[test]
    fn test_manifest_matching_its_file_name_wins() {
        let f = fixture("layouts");
        let mut a = LayoutConfig::new("alpha");
        a.global_alpha = 0.3;
        let b = LayoutConfig::new("beta");
        let path = f.dir.path().join("two.zip");
        write_test_zip(
            &path,
            &[
                ("a-copy.json", a.to_json().unwrap().as_bytes()),
                ("beta.json", b.to_json().unwrap().as_bytes()),
            ],
        );

        let staged = stage_import(&path).unwrap();
        assert_eq!(staged.name(), "beta");
    }

    #[test]
    fn test_manifest_in_subfolder_installs_siblings() {
        let mut f = fixture("layouts");
        let layout = LayoutConfig::new("nested");
        let path = f.dir.path().join("nested.zip");
        write_test_zip(
            &path,
            &[
                ("nested/nested.json", layout.to_json().unwrap().as_bytes()),
                ("nested/textures/x.png", b"x"),
                ("README.txt", b"ignored"),
            ],
        );

        let staged = stage_import(&path).unwrap();
        assert!(!staged.conflicts(&f.store));
        staged.commit(&mut f.store).unwrap();

        let mut content = String::new();
        File::open(f.store.textures_dir("nested").join("x.png"))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "x");
        assert!(!f.store.layout_dir("nested").join("README.txt").exists());
    }

    #[test]
    fn test_import_skips_symlinks() {
        let mut f = fixture("layouts");
        let layout = LayoutConfig::new("linked");
        let path = f.dir.path().join("linked.zip");
        {
            let mut zip = ZipWriter::new(File::create(&path).unwrap());
            let options = SimpleFileOptions::default();
            zip.start_file("linked.json", options).unwrap();
            zip.write_all(layout.to_json().unwrap().as_bytes()).unwrap();
            zip.start_file("textures/real.png", options).unwrap();
            zip.write_all(b"real").unwrap();
            zip.add_symlink("textures/leak.png", "/etc/hostname", options).unwrap();
            zip.add_symlink("textures/loop", ".", options).unwrap();
            zip.finish().unwrap();
        }

        import(&mut f.store, &path, |_| true).unwrap();

        let textures = f.store.textures_dir("linked");
        assert_eq!(fs::read(textures.join("real.png")).unwrap(), b"real");
        assert!(fs::symlink_metadata(textures.join("leak.png")).is_err());
        assert!(fs::symlink_metadata(textures.join("loop")).is_err());

        let mut installed = Vec::new();
        collect_files(&f.store.layout_dir("linked"), &mut installed).unwrap();
        assert_eq!(installed.len(), 2, "{installed:?}");
    }

    #[test]
    fn test_export_keeps_textures_with_the_same_file_name_apart() {
        let mut src = fixture("src");
        let mut layout = LayoutConfig::new("twins");
        layout.buttons.push(
            ButtonConfig::new("A", WidgetKind::Button, Vec2::ZERO, Vec2::splat(50.0))
                .with_textures(TextureSource::external("a/x.png")),
        );
        layout.buttons.push(
            ButtonConfig::new("B", WidgetKind::Button, Vec2::ZERO, Vec2::splat(50.0))
                .with_textures(TextureSource::external("b/x.png")),
        );
        layout.buttons.push(
            ButtonConfig::new("C", WidgetKind::Button, Vec2::ZERO, Vec2::splat(50.0))
                .with_textures(TextureSource::external("a/x.png")),
        );
        layout.attach_buttons();
        src.store.save(&layout).unwrap();
        for (dir, bytes) in [("a", b"AAAA"), ("b", b"BBBB")] {
            let sub = src.store.textures_dir("twins").join(dir);
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join("x.png"), bytes).unwrap();
        }

        let bundle = export(&src.store, &layout, src.dir.path()).unwrap();
        assert_eq!(
            zip_entries(&bundle),
            vec!["textures/x-1.png", "textures/x.png", "twins.json"]
        );

        let mut dst = fixture("dst");
        let ImportOutcome::Imported(imported) = import(&mut dst.store, &bundle, |_| true).unwrap() else {
            panic!("expected import");
        };
        let textures = dst.store.textures_dir("twins");
        for (widget, bytes) in [("A", b"AAAA"), ("B", b"BBBB"), ("C", b"AAAA")] {
            let paths = imported.find(widget).unwrap().textures.external_paths().join("");
            assert_eq!(fs::read(textures.join(&paths)).unwrap(), bytes, "{widget}");
        }
        assert_eq!(imported.find("B").unwrap().textures, TextureSource::external("x-1.png"));
    }

    #[test]
    fn test_failed_commit_leaves_existing_layout_untouched() {
        let mut f = fixture("layouts");
        let layout = textured_layout(&mut f.store, "keep");
        let bundle = export(&f.store, &layout, f.dir.path()).unwrap();

        let mut changed = layout.clone();
        changed.global_alpha = 0.5;
        f.store.save(&changed).unwrap();
        let manifest = fs::read(f.store.manifest_path("keep")).unwrap();
        let ring = fs::read(f.store.textures_dir("keep").join("ring.png")).unwrap();

        // a plain file where the backup folder goes makes the swap fail
        let blocker = f.store.root().join(".keep.backup");
        fs::write(&blocker, b"in the way").unwrap();

        assert!(import(&mut f.store, &bundle, |_| true).is_err());
        assert_eq!(fs::read(f.store.manifest_path("keep")).unwrap(), manifest);
        assert_eq!(fs::read(f.store.textures_dir("keep").join("ring.png")).unwrap(), ring);
        assert_eq!(f.store.load("keep").unwrap().global_alpha, 0.5);

        let staging: Vec<_> = fs::read_dir(f.store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".import-"))
            .collect();
        assert!(staging.is_empty(), "{staging:?}");
    }

    #[test]
    fn test_failed_export_leaves_no_archive() {
        let mut f = fixture("layouts");
        let layout = textured_layout(&mut f.store, "nowhere");
        let file = f.dir.path().join("not-a-dir");
        fs::write(&file, b"plain file").unwrap();

        let dest = file.join("nowhere.zip");
        assert!(export(&f.store, &layout, &dest).is_err());
        assert_eq!(fs::read(&file).unwrap(), b"plain file");

        let stray: Vec<_> = fs::read_dir(f.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n != "layouts" && n != "not-a-dir")
            .collect();
        assert!(stray.is_empty(), "{stray:?}");
    }

    #[test]
    fn test_failed_export_keeps_previous_archive() {
        let mut f = fixture("layouts");
        let mut layout = textured_layout(&mut f.store, "previous");
        let dest = f.dir.path().join("previous.zip");
        fs::write(&dest, b"older bundle").unwrap();

        layout.buttons[0].size = Vec2::new(f32::NAN, 10.0);
        assert!(matches!(export(&f.store, &layout, &dest), Err(LayoutError::Corrupt { .. })));
        assert_eq!(fs::read(&dest).unwrap(), b"older bundle");
    }
}
