pub const POST_WITH_FRONTMATTER: &str = r#"---
title: Getting started
slug: getting-started
publishDate: 2026-05-01T09:00:00-07:00
createdAt: 2026-05-01T16:00:00.000Z
updatedAt: 2026-05-01T16:00:00.000Z
draft: false
---

First line of the body.

<!-- more -->

Rest of the body.
"#;

pub const POST_BODY: &str = "How to be a great software engineer?

Someone asked me this question today and I came up with a list of what
I try to do myself.
";
