// Fixed filename tables consulted by the project profiler.

pub fn manifest_kind(file_name: &str) -> Option<(&'static str, &'static str)> {
    match file_name {
        "package.json" => Some(("nodejs", "javascript")),
        "requirements.txt" | "pyproject.toml" | "setup.py" => Some(("python", "python")),
        "Cargo.toml" => Some(("rust", "rust")),
        "go.mod" => Some(("go", "go")),
        "pom.xml" | "build.gradle" => Some(("java", "java")),
        "composer.json" => Some(("php", "php")),
        "Gemfile" => Some(("ruby", "ruby")),
        _ => None,
    }
}

pub fn framework_marker(file_name: &str) -> Option<&'static str> {
    match file_name {
        "manage.py" => Some("django"),
        "next.config.js" | "next.config.mjs" => Some("nextjs"),
        "angular.json" => Some("angular"),
        "nuxt.config.js" | "nuxt.config.ts" => Some("nuxt"),
        "svelte.config.js" => Some("svelte"),
        "artisan" => Some("laravel"),
        "Rocket.toml" => Some("rocket"),
        _ => None,
    }
}

pub fn is_config_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "config.json" | "settings.py" | ".env.example" | "docker-compose.yml" | "Dockerfile"
    )
}

pub fn is_entry_point(file_name: &str) -> bool {
    matches!(
        file_name,
        "main.py" | "app.py" | "index.js" | "server.js" | "main.go" | "main.rs"
    )
}

pub fn is_build_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "Makefile" | "build.sh" | "webpack.config.js" | "vite.config.js"
    )
}

pub fn is_test_dir(dir_name: &str) -> bool {
    matches!(dir_name, "test" | "tests" | "__tests__" | "spec")
}
