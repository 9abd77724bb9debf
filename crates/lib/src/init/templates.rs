//! Template content for `hashpack init`.

/// Starter `hashpack.toml` spelling out the default rules.
pub const CONFIG_TEMPLATE: &str = r#"# hashpack build configuration
entry = "src/index.js"
# mode = "production"   # or "development"; HASHPACK_MODE and --mode override this

[output]
dir = "dist"
clean = true
# filename = "bundle.[contenthash].js"
# asset_filename = "[name].[contenthash].[ext]"
# public_path = "/"

[html]
template = "src/index.hbs"
title = "My hashpack app"
description = "Built with hashpack"

[[rules]]
name = "scripts"
test = '\.(m|c)?jsx?$'
use = ["script"]

[[rules]]
name = "images"
test = '(?i)\.(jpe?g|png|gif|svg|webp)$'
type = "asset"
max_size = 3072

[[rules]]
name = "text"
test = '\.txt$'
type = "asset/source"

[[rules]]
name = "css"
test = '\.css$'
use = ["extract-css", "css"]

[[rules]]
name = "templates"
test = '\.hbs$'
use = ["template"]
"#;

/// Starter entry module.
pub const INDEX_JS_TEMPLATE: &str = r#"const heading = document.createElement("h1");
heading.textContent = "Hello from hashpack";
document.body.appendChild(heading);

if (process.env.NODE_ENV !== "production") {
  console.log("development build");
}
"#;

/// Starter entry document.
pub const INDEX_HBS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta name="description" content="{{description}}" />
    <title>{{title}}</title>
  </head>
  <body></body>
</html>
"#;
