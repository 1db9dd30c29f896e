//! Instruction document handed to the generator.

use pressline_shared::{PresslineError, Result, RunContext};

const BUILTIN_TEMPLATE: &str = r#"You are working in the source tree of a static website.

Read the JSON task batch at {batch_file}. It was prepared on {today}.

For each entry in its "tasks" array:

1. Create the page at the path for its type:
{content_paths}

2. Match the structure of the site's existing pages: reuse the header and
   navigation, the footer, the stylesheet variables, font loading and meta tags.

3. Add SEO metadata:
   - <title> from the task title, and a meta description that uses the
     primary keyword naturally
   - a canonical URL and OpenGraph tags
   - <meta property="article:published_time"> set to the task's publish_date
   - <meta property="article:section"> set to the task's category when present

4. Write helpful, original content of at least 500 words. Use the title as the
   only <h1>, work in the primary and secondary keywords naturally, and state
   the estimated reading time as "N min read".

5. Link to the homepage, to the contact page, and to every page listed in the
   task's internal_links field.

Rules:
- Do NOT run shell commands.
- Do NOT delete any existing file.
- Do NOT edit anything between <!-- ...:START --> and <!-- ...:END --> comment
  markers, and do not edit the sitemap. Listings are regenerated after you finish.
- Keep the visual design consistent with the existing site.

When done, print a summary of files created, files updated, and any errors."#;

/// Build the generator instructions, from `generator.prompt_file` when set.
///
/// Placeholders: `{batch_file}`, `{today}`, `{content_paths}`.
pub fn build_prompt(ctx: &RunContext) -> Result<String> {
    let template = match &ctx.generator.prompt_file {
        Some(file) => {
            let path = ctx.root().join(file);
            std::fs::read_to_string(&path).map_err(|e| {
                PresslineError::config(format!(
                    "cannot read prompt file {}: {e}",
                    path.display()
                ))
            })?
        }
        None => BUILTIN_TEMPLATE.to_string(),
    };

    Ok(template
        .replace("{batch_file}", &ctx.publish.batch_file)
        .replace("{today}", &ctx.site.today_str())
        .replace("{content_paths}", &content_paths(ctx)))
}

/// One line per content type: `- type "article" => content/<slug>/index.html`.
fn content_paths(ctx: &RunContext) -> String {
    ctx.site
        .site
        .content_types
        .iter()
        .map(|t| {
            format!(
                "   - type \"{}\" => {}/<slug>/{}",
                t.name,
                t.dir.trim_end_matches('/'),
                ctx.site.site.artifact_file
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
