//! Prompt construction for the recommendation model.

use super::models::TasteProfile;
use std::fmt::Write;

/// System prompt establishing the model's role and the strict-JSON reply
/// contract the pipeline parses against.
pub fn build_system_prompt() -> &'static str {
    r#"You are a music taste analyst and discovery engine for Tastelog, a personal music diary app. You analyze listening patterns, ratings, and preferences to generate deeply personalized music recommendations.

You MUST respond with ONLY a valid JSON object. No markdown code fences, no explanation text, no preamble — just the raw JSON.

The JSON schema you must follow:
{
  "taste_summary": "A 2-3 sentence summary of the user's overall music taste, noting key patterns and preferences.",
  "recommendations": [
    {
      "type": "track|album|artist",
      "title": "Name of the track, album, or artist",
      "artist": "Artist name (for tracks and albums) or the artist themselves",
      "album": "Album name (optional, for tracks)",
      "year": "Release year (optional)",
      "why": "1-2 sentences explaining why this fits, referencing specific data from the user's profile",
      "discovery_angle": "cross_genre|deep_cut|era_bridge|mood_match|artist_evolution",
      "mood_tags": ["tag1", "tag2"]
    }
  ]
}

Rules:
- Generate exactly 10 recommendations: aim for 6 tracks, 2 albums, and 2 artists.
- The "why" field MUST reference something specific from the user's data (a genre they listen to, an artist they like, a rating they gave, their listening time patterns, etc.).
- Do NOT recommend anything that already appears in the user's top tracks, top artists, recently played, or highly rated lists.
- Prioritize cross-genre discoveries that will surprise the user while still connecting to their taste.
- The "discovery_angle" must be one of: cross_genre, deep_cut, era_bridge, mood_match, artist_evolution.
- Return ONLY the JSON object."#
}

/// Renders a taste profile into the user message for the model. When
/// `user_prompt` is present the listener's specific request is appended and
/// marked as the primary driver.
pub fn format_taste_profile(profile: &TasteProfile, user_prompt: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str("## My Music Taste Profile\n\n");

    if !profile.top_genres.is_empty() {
        out.push_str("### Top Genres\n");
        out.push_str(&profile.top_genres.join(", "));
        out.push_str("\n\n");
    }

    if !profile.top_artists.is_empty() {
        out.push_str("### Top Artists\n");
        for (i, artist) in profile.top_artists.iter().enumerate() {
            let _ = write!(out, "{}. {}", i + 1, artist.name);
            if !artist.genres.is_empty() {
                let _ = write!(out, " (genres: {})", artist.genres.join(", "));
            }
            if artist.play_count > 0 {
                let _ = write!(out, " — listened {} times", artist.play_count);
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !profile.top_tracks.is_empty() {
        out.push_str("### Top Tracks\n");
        for (i, track) in profile.top_tracks.iter().enumerate() {
            let _ = writeln!(out, "{}. \"{}\" by {}", i + 1, track.name, track.artist);
        }
        out.push('\n');
    }

    if !profile.recent_plays.is_empty() {
        out.push_str("### Recently Played (distinct)\n");
        for play in &profile.recent_plays {
            let _ = writeln!(out, "- \"{}\" by {}", play.name, play.artist);
        }
        out.push('\n');
    }

    if !profile.highly_rated.is_empty() {
        out.push_str("### Highly Rated (8-10/10)\n");
        for rated in &profile.highly_rated {
            if rated.artist.is_empty() {
                let _ = writeln!(
                    out,
                    "- [{}] {} — {}/10",
                    rated.kind.as_str(),
                    rated.name,
                    rated.score
                );
            } else {
                let _ = writeln!(
                    out,
                    "- [{}] \"{}\" by {} — {}/10",
                    rated.kind.as_str(),
                    rated.name,
                    rated.artist,
                    rated.score
                );
            }
        }
        out.push('\n');
    }

    if !profile.on_rotation.is_empty() {
        out.push_str("### Currently On Rotation\n");
        for entry in &profile.on_rotation {
            if entry.artist.is_empty() {
                let _ = writeln!(out, "- [{}] {}", entry.kind.as_str(), entry.name);
            } else {
                let _ = writeln!(
                    out,
                    "- [{}] \"{}\" by {}",
                    entry.kind.as_str(),
                    entry.name,
                    entry.artist
                );
            }
        }
        out.push('\n');
    }

    if !profile.user_tags.is_empty() {
        out.push_str("### My Tags\n");
        out.push_str(&profile.user_tags.join(", "));
        out.push_str("\n\n");
    }

    if !profile.listening_hours.is_empty() {
        out.push_str("### Listening Patterns\nMost active at: ");
        let parts: Vec<String> = profile
            .listening_hours
            .iter()
            .map(|h| format!("{} ({} plays)", format_hour_range(h.hour), h.count))
            .collect();
        out.push_str(&parts.join(", "));
        out.push_str("\n\n");
    }

    match user_prompt {
        Some(request) if !request.is_empty() => {
            out.push_str("---\n\n");
            out.push_str("## IMPORTANT: USER'S SPECIFIC REQUEST\n\n");
            let _ = writeln!(out, "The user is asking for: \"{}\"\n", request);
            out.push_str(
                "Your recommendations MUST directly address this request. The taste profile \
                 above is context for personalization, but the user's request is the PRIMARY \
                 driver. Every recommendation should fit what they asked for. Do NOT just \
                 recommend based on taste — focus on their specific request first, then \
                 personalize using their profile.\n",
            );
        }
        _ => {
            out.push_str(
                "Based on this profile, generate 10 music recommendations that go beyond what \
                 the user already knows.\n",
            );
        }
    }

    out
}

/// Formats an hour (0-23) as a human-readable range like "10pm-11pm".
fn format_hour_range(hour: u8) -> String {
    format!("{}-{}", format_hour(hour), format_hour((hour + 1) % 24))
}

fn format_hour(hour: u8) -> String {
    match hour {
        0 => "12am".to_string(),
        h if h < 12 => format!("{}am", h),
        12 => "12pm".to_string(),
        h => format!("{}pm", h - 12),
    }
}
