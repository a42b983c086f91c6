//! Path classification for the library scanner.
//!
//! A pure, total function from a file path to a classification: extra,
//! numbered TV episode, air-date TV episode, movie, or generic video.
//! Detection order matters and first match wins:
//!
//! 1. Extras (ancestor folder name or filename suffix)
//! 2. Numbered TV (`SxxEyy`, or a season/specials folder plus `Eyy`/`Epyy`)
//! 3. Air-date TV (`YYYY-MM-DD` or `DD-MM-YYYY` in the filename)
//! 4. Movies (title plus year in parentheses or dots)
//! 5. Generic fallback
//!
//! Besides the media kind, classification derives the `source_path`: the
//! canonical folder owning the show or movie, which the scanner uses as the
//! migration key.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static TV_SXXEYY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S(\d{1,3})E(\d{1,4})(?:-E?(\d{1,4}))?").unwrap());

static TV_EYY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)E(\d{1,4})(?:-E?(\d{1,4}))?").unwrap());

static TV_EPYY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Ep(\d{1,4})(?:-(?:Ep?)?(\d{1,4}))?").unwrap());

static SEASON_FOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^season\s+(\d+)$").unwrap());

static DATE_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[-.](\d{1,2})[-.](\d{1,2})").unwrap());

static DATE_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[-.](\d{1,2})[-.](\d{4})").unwrap());

static MOVIE_YEAR_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap());

static MOVIE_YEAR_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\.(\d{4})(?:\.|$)").unwrap());

static EDITION_BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{edition-([^}]+)\}").unwrap());

static EDITION_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

static EDITION_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*(.+?)\s*$").unwrap());

static PART_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-\s*(?:cd|dvd|part|pt|disc|disk)\s*#?(\d+)").unwrap());

static EXTERNAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[{](imdb|tmdb|tvdb)(?:id)?[:\- ]([^\]}]+)[\]}]").unwrap());

/// Folder names whose contents are always extras, paired with the extra type.
const EXTRA_FOLDERS: &[(&str, &str)] = &[
    ("behind the scenes", "behindthescenes"),
    ("deleted scenes", "deleted"),
    ("interviews", "interview"),
    ("scenes", "scene"),
    ("samples", "sample"),
    ("shorts", "short"),
    ("featurettes", "featurette"),
    ("clips", "clip"),
    ("others", "other"),
    ("extras", "extra"),
    ("trailers", "trailer"),
];

/// Filename stem suffixes marking an extra, paired with the extra type.
const EXTRA_SUFFIXES: &[(&str, &str)] = &[
    ("-behindthescenes", "behindthescenes"),
    ("-deleted", "deleted"),
    ("-featurette", "featurette"),
    ("-interview", "interview"),
    ("-scene", "scene"),
    ("-short", "short"),
    ("-trailer", "trailer"),
    ("-other", "other"),
];

/// Parsed movie attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieInfo {
    pub title: String,
    pub year: Option<i32>,
    pub edition: Option<String>,
    pub part_index: Option<i64>,
    pub external_ids: HashMap<String, String>,
    /// The movie folder, when the file lives in one named after it.
    pub source_path: Option<PathBuf>,
}

/// Parsed TV episode attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TvEpisodeInfo {
    pub show_title: String,
    pub season: i64,
    pub episode: i64,
    pub episode_end: Option<i64>,
    pub title: Option<String>,
    /// `YYYY-MM-DD` for air-date episodes.
    pub air_date: Option<String>,
    pub year: Option<i32>,
    pub edition: Option<String>,
    pub part_index: Option<i64>,
    pub external_ids: HashMap<String, String>,
    /// The show root folder.
    pub source_path: PathBuf,
}

/// Parsed extra attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraInfo {
    pub title: String,
    pub extra_type: String,
    /// The folder that owns this extra: the parent of the extras folder,
    /// or the file's own folder for suffix-marked extras. Extras are
    /// staged under this key so they can later be linked to the show or
    /// movie owning the same folder.
    pub owner_path: Option<PathBuf>,
}

/// Generic video fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericInfo {
    pub title: String,
}

/// Result of classifying a path. First matching rule wins; `Generic` is the
/// total fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Movie(MovieInfo),
    TvEpisode(TvEpisodeInfo),
    Extra(ExtraInfo),
    Generic(GenericInfo),
}

impl Classification {
    /// The canonical owning folder, when this classification has one.
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Self::Movie(movie) => movie.source_path.as_deref(),
            Self::TvEpisode(tv) => Some(&tv.source_path),
            Self::Extra(_) | Self::Generic(_) => None,
        }
    }
}

/// Classify a path. Total: every input produces a classification.
pub fn classify(path: &Path) -> Classification {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(extra) = detect_extra(path, &stem) {
        return Classification::Extra(extra);
    }

    if let Some(tv) = detect_numbered_tv(path, &stem) {
        return Classification::TvEpisode(tv);
    }

    if let Some(tv) = detect_date_tv(path, &stem) {
        return Classification::TvEpisode(tv);
    }

    if let Some(movie) = detect_movie(path, &stem) {
        return Classification::Movie(movie);
    }

    Classification::Generic(GenericInfo {
        title: path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    })
}

/// Folder names of all ancestors, innermost last.
fn ancestor_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut current = path.parent();
    while let Some(dir) = current {
        if let Some(name) = dir.file_name() {
            names.push(name.to_string_lossy().to_string());
        }
        current = dir.parent();
    }
    names.reverse();
    names
}

fn is_season_folder(name: &str) -> bool {
    SEASON_FOLDER.is_match(name)
}

fn is_specials_folder(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "special" || lower == "specials"
}

// ---------- Extras ----------

fn detect_extra(path: &Path, stem: &str) -> Option<ExtraInfo> {
    // Walk ancestors innermost-first so the nearest extras folder decides
    // both the type and the owning folder (its parent).
    let mut current = path.parent();
    while let Some(dir) = current {
        if let Some(name) = dir.file_name() {
            let folded = name.to_string_lossy().to_lowercase();
            for &(folder_name, extra_type) in EXTRA_FOLDERS {
                if folded == folder_name {
                    return Some(ExtraInfo {
                        title: stem.to_string(),
                        extra_type: extra_type.to_string(),
                        owner_path: dir.parent().map(|p| p.to_path_buf()),
                    });
                }
            }
        }
        current = dir.parent();
    }

    let folded_stem = stem.to_lowercase();
    for &(suffix, extra_type) in EXTRA_SUFFIXES {
        if folded_stem.ends_with(suffix) {
            let title = stem[..stem.len() - suffix.len()].trim().to_string();
            return Some(ExtraInfo {
                title,
                extra_type: extra_type.to_string(),
                owner_path: path.parent().map(|p| p.to_path_buf()),
            });
        }
    }

    None
}

// ---------- TV ----------

/// Derive the show root for an episode file: the grandparent when the file
/// sits inside a season or specials folder, else the parent (flat layout).
fn tv_source_path(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    let parent_name = parent.file_name()?.to_string_lossy();
    if is_season_folder(&parent_name) || is_specials_folder(&parent_name) {
        parent.parent().map(|p| p.to_path_buf())
    } else {
        Some(parent.to_path_buf())
    }
}

/// Show title: the innermost ancestor folder that is not a season or
/// specials folder; falls back to the stem with episode markers stripped.
fn show_title(path: &Path, stem: &str) -> String {
    for folder in ancestor_names(path).into_iter().rev() {
        if !is_season_folder(&folder) && !is_specials_folder(&folder) {
            return folder;
        }
    }

    let cleaned = TV_SXXEYY.replace_all(stem, "");
    let cleaned = TV_EPYY.replace_all(&cleaned, "");
    let cleaned = TV_EYY.replace_all(&cleaned, "");
    cleaned.trim().trim_matches('.').to_string()
}

fn detect_numbered_tv(path: &Path, stem: &str) -> Option<TvEpisodeInfo> {
    // SxxEyy anywhere in the filename.
    if let Some(caps) = TV_SXXEYY.captures(stem) {
        let season = caps.get(1)?.as_str().parse::<i64>().ok()?;
        let episode = caps.get(2)?.as_str().parse::<i64>().ok()?;
        let episode_end = caps.get(3).and_then(|m| m.as_str().parse::<i64>().ok());
        let suffix = &stem[caps.get(0)?.end()..];

        return Some(build_numbered_episode(
            path, stem, season, episode, episode_end, suffix,
        ));
    }

    // A season or specials parent folder plus a bare Eyy / Epyy filename.
    let parent_name = path.parent()?.file_name()?.to_string_lossy().to_string();
    let season = if let Some(caps) = SEASON_FOLDER.captures(&parent_name) {
        caps.get(1)?.as_str().parse::<i64>().ok()?
    } else if is_specials_folder(&parent_name) {
        0
    } else {
        return None;
    };

    for pattern in [&*TV_EPYY, &*TV_EYY] {
        if let Some(caps) = pattern.captures(stem) {
            let episode = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let episode_end = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
            let suffix = &stem[caps.get(0)?.end()..];

            return Some(build_numbered_episode(
                path, stem, season, episode, episode_end, suffix,
            ));
        }
    }

    None
}

fn build_numbered_episode(
    path: &Path,
    stem: &str,
    season: i64,
    episode: i64,
    episode_end: Option<i64>,
    suffix: &str,
) -> TvEpisodeInfo {
    let mut info = TvEpisodeInfo {
        show_title: show_title(path, stem),
        season,
        episode,
        episode_end,
        title: None,
        air_date: None,
        year: None,
        edition: None,
        part_index: None,
        external_ids: parse_external_ids(stem),
        source_path: tv_source_path(path).unwrap_or_default(),
    };
    parse_episode_suffix(suffix, &mut info);
    info
}

fn detect_date_tv(path: &Path, stem: &str) -> Option<TvEpisodeInfo> {
    let (year, month, day) = if let Some(caps) = DATE_YMD.captures(stem) {
        (
            caps.get(1)?.as_str().parse::<i32>().ok()?,
            caps.get(2)?.as_str().parse::<u32>().ok()?,
            caps.get(3)?.as_str().parse::<u32>().ok()?,
        )
    } else if let Some(caps) = DATE_DMY.captures(stem) {
        (
            caps.get(3)?.as_str().parse::<i32>().ok()?,
            caps.get(2)?.as_str().parse::<u32>().ok()?,
            caps.get(1)?.as_str().parse::<u32>().ok()?,
        )
    } else {
        return None;
    };

    // Reject impossible dates so digit runs like 2024.13.40 fall through to
    // the later detectors.
    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;

    // Air-date convention: season is the season folder number when the file
    // sits in one, else the air year; episode is the number of days since
    // 1970-01-01, which is stable and strictly ordered by date.
    let parent_name = path.parent()?.file_name()?.to_string_lossy().to_string();
    let season = SEASON_FOLDER
        .captures(&parent_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(year as i64);

    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let episode = (date - epoch).num_days();

    Some(TvEpisodeInfo {
        show_title: show_title(path, stem),
        season,
        episode,
        episode_end: None,
        title: None,
        air_date: Some(format!("{:04}-{:02}-{:02}", year, month, day)),
        year: Some(year),
        edition: None,
        part_index: None,
        external_ids: parse_external_ids(stem),
        source_path: tv_source_path(path).unwrap_or_default(),
    })
}

// ---------- Movies ----------

/// Strip whitespace and dots, lowercase. Used for loose movie-folder
/// matching.
fn normalise(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_lowercase()
}

/// Derive the movie folder: the file's parent when its normalised name
/// contains both the normalised title and the year.
///
/// The containment match is deliberately loose and can false-positive
/// (e.g. "Her" inside "Brother"); it is logged but honoured.
fn movie_source_path(path: &Path, title: &str, year: i32) -> Option<PathBuf> {
    let parent = path.parent()?;
    let parent_name = parent.file_name()?.to_string_lossy();
    let folder = normalise(&parent_name);
    let wanted_title = normalise(title);
    let wanted_year = year.to_string();

    if !folder.contains(&wanted_title) || !folder.contains(&wanted_year) {
        return None;
    }

    if folder != format!("{}({})", wanted_title, wanted_year)
        && folder != format!("{}{}", wanted_title, wanted_year)
    {
        tracing::warn!(
            "Movie folder {:?} matched {:?} ({}) only by loose containment",
            parent_name,
            title,
            year
        );
    }

    Some(parent.to_path_buf())
}

fn detect_movie(path: &Path, stem: &str) -> Option<MovieInfo> {
    let caps = MOVIE_YEAR_PARENS
        .captures(stem)
        .or_else(|| MOVIE_YEAR_DOTS.captures(stem))?;

    let title = caps.get(1)?.as_str().trim().to_string();
    let year = caps.get(2)?.as_str().parse::<i32>().ok()?;
    let suffix = &stem[caps.get(0)?.end()..];

    let mut info = MovieInfo {
        source_path: movie_source_path(path, &title, year),
        title,
        year: Some(year),
        edition: None,
        part_index: None,
        external_ids: parse_external_ids(stem),
    };
    parse_movie_suffix(suffix, &mut info);

    Some(info)
}

// ---------- Suffix parsing ----------

/// Remove the part marker (` - cd1`, ` - part 2`, ...) from a suffix,
/// returning the remainder and the parsed part index.
fn split_part_suffix(suffix: &str) -> (String, Option<i64>) {
    match PART_SUFFIX.captures(suffix) {
        Some(caps) => {
            let part = caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
            let whole = caps.get(0).unwrap();
            let mut rest = String::with_capacity(suffix.len());
            rest.push_str(&suffix[..whole.start()]);
            rest.push_str(&suffix[whole.end()..]);
            (rest, part)
        }
        None => (suffix.to_string(), None),
    }
}

/// Strip external id tags so `[imdbid-tt123]` is not mistaken for an
/// edition bracket.
fn strip_external_ids(suffix: &str) -> String {
    EXTERNAL_ID.replace_all(suffix, "").to_string()
}

fn parse_edition(suffix: &str) -> Option<String> {
    if let Some(caps) = EDITION_BRACES.captures(suffix) {
        return Some(caps.get(1).unwrap().as_str().trim().to_string());
    }
    if let Some(caps) = EDITION_BRACKETS.captures(suffix) {
        return Some(caps.get(1).unwrap().as_str().trim().to_string());
    }
    if let Some(caps) = EDITION_DASH.captures(suffix) {
        let label = caps.get(1).unwrap().as_str().trim();
        if !label.is_empty() {
            return Some(label.to_string());
        }
    }
    None
}

fn parse_movie_suffix(suffix: &str, info: &mut MovieInfo) {
    let cleaned = strip_external_ids(suffix);
    let (rest, part_index) = split_part_suffix(&cleaned);
    info.part_index = part_index;
    info.edition = parse_edition(&rest);
}

/// Episode suffixes: `{edition-X}` or `[X]` label a version; a plain
/// ` - Name` remainder is the episode title.
fn parse_episode_suffix(suffix: &str, info: &mut TvEpisodeInfo) {
    let cleaned = strip_external_ids(suffix);
    let (rest, part_index) = split_part_suffix(&cleaned);
    info.part_index = part_index;

    if let Some(caps) = EDITION_BRACES.captures(&rest) {
        info.edition = Some(caps.get(1).unwrap().as_str().trim().to_string());
    } else if let Some(caps) = EDITION_BRACKETS.captures(&rest) {
        info.edition = Some(caps.get(1).unwrap().as_str().trim().to_string());
    }

    let without_labels = EDITION_BRACES.replace_all(&rest, "");
    let without_labels = EDITION_BRACKETS.replace_all(&without_labels, "");
    if let Some(caps) = EDITION_DASH.captures(without_labels.trim()) {
        let title = caps.get(1).unwrap().as_str().trim();
        if !title.is_empty() {
            info.title = Some(title.to_string());
        }
    }
}

fn parse_external_ids(text: &str) -> HashMap<String, String> {
    let mut ids = HashMap::new();
    for caps in EXTERNAL_ID.captures_iter(text) {
        if let (Some(id_type), Some(id_value)) = (caps.get(1), caps.get(2)) {
            ids.insert(
                id_type.as_str().to_lowercase(),
                id_value.as_str().trim().to_string(),
            );
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(path: &str) -> Classification {
        classify(Path::new(path))
    }

    #[test]
    fn test_extra_folder_beats_everything() {
        // An extras folder wins even when the filename looks like a movie.
        let result = classify_str("/lib/Avatar (2009)/Behind The Scenes/MakingOf.mkv");
        match result {
            Classification::Extra(extra) => {
                assert_eq!(extra.extra_type, "behindthescenes");
                assert_eq!(extra.title, "MakingOf");
                assert_eq!(
                    extra.owner_path.as_deref(),
                    Some(Path::new("/lib/Avatar (2009)"))
                );
            }
            other => panic!("expected Extra, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_filename_suffix() {
        let result = classify_str("/lib/Movies/Avatar (2009)-trailer.mkv");
        match result {
            Classification::Extra(extra) => {
                assert_eq!(extra.extra_type, "trailer");
                assert_eq!(extra.title, "Avatar (2009)");
                assert_eq!(extra.owner_path.as_deref(), Some(Path::new("/lib/Movies")));
            }
            other => panic!("expected Extra, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_sxxeyy() {
        let result = classify_str("/root/TV/Some Show/Season 1/Some.Show.S01E01.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.season, 1);
                assert_eq!(tv.episode, 1);
                assert_eq!(tv.show_title, "Some Show");
                assert_eq!(tv.source_path, Path::new("/root/TV/Some Show"));
                assert!(tv.episode_end.is_none());
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_episode_range() {
        let result = classify_str("/tv/Show/Show.S02E03-E04.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.season, 2);
                assert_eq!(tv.episode, 3);
                assert_eq!(tv.episode_end, Some(4));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_season_folder_with_bare_episode() {
        let result = classify_str("/tv/Some Show/Season 2/E05.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.season, 2);
                assert_eq!(tv.episode, 5);
                assert_eq!(tv.show_title, "Some Show");
                assert_eq!(tv.source_path, Path::new("/tv/Some Show"));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_season_folder_with_ep_prefix() {
        let result = classify_str("/tv/Some Show/Season 3/Ep12.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.season, 3);
                assert_eq!(tv.episode, 12);
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_specials_folder_is_season_zero() {
        let result = classify_str("/tv/Some Show/Specials/E01.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.season, 0);
                assert_eq!(tv.episode, 1);
                assert_eq!(tv.source_path, Path::new("/tv/Some Show"));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_flat_show_folder_source_path() {
        let result = classify_str("/tv/Some Show/Some.Show.S01E02.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.source_path, Path::new("/tv/Some Show"));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_air_date_ymd() {
        let result = classify_str("/tv/News Show/2024-10-15.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.air_date.as_deref(), Some("2024-10-15"));
                assert_eq!(tv.season, 2024);
                assert_eq!(tv.episode, 20011); // days since 1970-01-01
                assert_eq!(tv.year, Some(2024));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_air_date_dmy() {
        let result = classify_str("/tv/News Show/15.10.2024.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.air_date.as_deref(), Some("2024-10-15"));
                assert_eq!(tv.episode, 20011);
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_tv_air_date_invalid_date_falls_through() {
        let result = classify_str("/videos/2024.13.40 oddity.mkv");
        assert!(matches!(result, Classification::Generic(_)));
    }

    #[test]
    fn test_movie_year_parens() {
        let result = classify_str("/movies/Avatar (2009).mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.title, "Avatar");
                assert_eq!(movie.year, Some(2009));
                assert!(movie.source_path.is_none());
                assert!(movie.edition.is_none());
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_year_dots() {
        let result = classify_str("/movies/Avatar.2009.mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.title, "Avatar");
                assert_eq!(movie.year, Some(2009));
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_folder_source_path() {
        let result = classify_str("/movies/Avatar (2009)/Avatar (2009).mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(
                    movie.source_path.as_deref(),
                    Some(Path::new("/movies/Avatar (2009)"))
                );
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_edition_dash() {
        let result = classify_str("/movies/Avatar (2009)/Avatar (2009) - Directors Cut.mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.edition.as_deref(), Some("Directors Cut"));
                assert_eq!(
                    movie.source_path.as_deref(),
                    Some(Path::new("/movies/Avatar (2009)"))
                );
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_edition_braces() {
        let result = classify_str("/movies/Avatar (2009) {edition-Extended}.mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.edition.as_deref(), Some("Extended"));
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_part_suffix_is_not_an_edition() {
        let result = classify_str("/movies/Avatar (2009) - cd1.mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.part_index, Some(1));
                assert!(movie.edition.is_none());
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_edition_and_part() {
        let result = classify_str("/movies/Avatar (2009) - Directors Cut - part2.mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(movie.edition.as_deref(), Some("Directors Cut"));
                assert_eq!(movie.part_index, Some(2));
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_movie_external_ids() {
        let result = classify_str("/movies/Avatar (2009) [imdbid-tt0499549].mkv");
        match result {
            Classification::Movie(movie) => {
                assert_eq!(
                    movie.external_ids.get("imdb").map(String::as_str),
                    Some("tt0499549")
                );
                // The id tag must not be mistaken for an edition bracket.
                assert!(movie.edition.is_none());
            }
            other => panic!("expected Movie, got {:?}", other),
        }
    }

    #[test]
    fn test_episode_title_after_dash() {
        let result = classify_str("/tv/Some Show/Season 1/Some.Show.S01E05 - The One.mkv");
        match result {
            Classification::TvEpisode(tv) => {
                assert_eq!(tv.title.as_deref(), Some("The One"));
            }
            other => panic!("expected TvEpisode, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_fallback() {
        let result = classify_str("/videos/GoPro Mountain Run.mp4");
        match result {
            Classification::Generic(generic) => {
                assert_eq!(generic.title, "GoPro Mountain Run.mp4");
            }
            other => panic!("expected Generic, got {:?}", other),
        }
    }

    #[test]
    fn test_totality_on_odd_inputs() {
        // classify never panics and always returns something
        for path in ["", "/", "/x", "/x/.mkv", "weird", "/a/b/c/d/e/f.mkv"] {
            let _ = classify_str(path);
        }
    }

    #[test]
    fn test_detection_order_extra_before_tv() {
        let result = classify_str("/tv/Some Show/Extras/Some.Show.S01E01.mkv");
        assert!(matches!(result, Classification::Extra(_)));
    }

    #[test]
    fn test_detection_order_tv_before_movie() {
        // Contains both an SxxEyy marker and a (year): TV wins.
        let result = classify_str("/tv/Show (2020)/Show (2020) S01E01.mkv");
        assert!(matches!(result, Classification::TvEpisode(_)));
    }
}
