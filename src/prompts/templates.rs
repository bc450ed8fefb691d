//! Prompt texts, one per `PromptId`

pub(super) const EXTRACT_KEYWORDS: &str = "\
You extract search keywords from research queries.

The user below wants to develop a new research proposal. Extract one to four keywords that capture \
the core topic or method of interest. Every keyword must be a lowercase English noun or noun phrase.

User query: {query}

Reply with the keywords only, separated by commas, with no other text.
";

pub(super) const EXPAND_BACKGROUND: &str = "\
You turn short research queries into detailed research backgrounds.

Query: {query}
Keywords: {keywords}

Write a research background of 200 to 500 words in Markdown that states the problem, gives the \
context and motivation, and explains why the area matters. Keep the language accessible to an \
undergraduate reader.
";

pub(super) const BRAINSTORM: &str = "\
You are an AI researcher known for original thinking.

Research background:
{background}

Brainstorm 3 to 4 high-level directions that could address the problems in this background. Favor \
creative approaches over restatements of existing methods.

Use exactly this format:
**Idea 1**: ...
**Idea 2**: ...
**Idea 3**: ...
**Idea 4**: ...
";

pub(super) const PAPER_INSPIRATION: &str = "\
You draw research inspiration from academic papers.

Research background:
{background}

Paper
Title: {title}
Abstract: {abstract}

In 2 to 3 sentences of Markdown, name one insight or opportunity this paper opens, connect it to \
the background and suggest a research direction.
";

pub(super) const GLOBAL_INSPIRATION: &str = "\
You draw research inspiration from academic papers.

User query: {query}

Related papers (latest, highly cited and most relevant):
{papers}

Read the papers as a whole rather than one at a time. Propose one novel research inspiration that \
answers the user's query and grows out of the assumptions, gaps or unexplored openings in this \
literature, not out of stacking existing methods together. Reply in Markdown.
";

pub(super) const IDEAS_FROM_INSPIRATIONS: &str = "\
You are an experienced AI researcher.

User query: {query}

Research background:
{background}

Inspirations:
{inspirations}

Generate exactly {count} research ideas from these inspirations. Every idea must target the problem \
and application scenario of the user's query; generic ideas are not acceptable.

Use exactly this format:
**Idea 1**: ...
**Idea 2**: ...
**Idea 3**: ...
";

pub(super) const IDEAS_FROM_GLOBAL_INSPIRATION: &str = "\
You are an experienced AI researcher.

User query: {query}

Research background:
{background}

Inspiration:
{inspiration}

Generate 2 to 3 research ideas from this inspiration. Every idea must target the problem and \
application scenario of the user's query; generic ideas are not acceptable.

Use exactly this format:
**Idea 1**: ...
**Idea 2**: ...
";

pub(super) const INTEGRATE_BRAINSTORM: &str = "\
You are an AI researcher who combines ideas into stronger ones.

You are given the user's query, a research background, brainstorming ideas written from the \
background alone, and ideas you generated earlier from related papers. Build on the generated ideas \
and fold in the creative parts of the brainstorm. Keep an earlier idea unchanged if it already \
holds up.

User query: {query}

Research background:
{background}

Brainstorming ideas:
{brainstorm}

Generated ideas:
{ideas}

Return exactly {count} ideas. Each one is a single short description of one or two sentences with \
no sub-sections, on its own line, in exactly this format:
**Idea 1**: ...
**Idea 2**: ...
**Idea 3**: ...
";

pub(super) const CRITIQUE_IDEA: &str = "\
You review research ideas critically.

Research background:
{background}

Related papers:
{papers_summary}

Idea:
{idea}

Point out the main weaknesses: overlap with existing work, missing novelty, feasibility problems or \
drift from the background. Give concrete suggestions for improving the idea.
";

pub(super) const REFINE_IDEA: &str = "\
You improve research ideas.

Research background:
{background}

Original idea:
{idea}

Review:
{criticism}

Revise the idea so it answers the review while staying novel and feasible. Reply with the revised \
idea only.
";

pub(super) const EVALUATE_IDEA: &str = "\
You score research ideas.

Research background:
{background}

Idea:
{idea}

Score the idea from 0.0 to 5.0 on feasibility (how practical it is to carry out) and novelty (how \
original it is). Use one decimal place and the full range so that different ideas get different \
scores.

First line: a JSON object such as {\"feasibility\": 4.2, \"novelty\": 3.8}
Then repeat the scores as:
Feasibility: 4.2/5
Novelty: 3.8/5
Then give a short justification.
";

pub(super) const RESEARCH_PLAN: &str = "\
You write research proposals.

User query: {query}

Related papers:
{papers}

Inspiration:
{inspiration}

Best idea:
{best_idea}

Write a complete research proposal built strictly on the best idea; its title, method and technical \
details must all follow that idea. Unless the query asks for another structure, use these sections: \
Research Background, Limitations of Current Work, Proposed Research Plan, References.

Cite papers in the body as [1], [2], [3] numbered in order of first mention with no gaps, and list \
them with full titles under References in the same numbering.

Reply in Markdown and begin directly with the first heading. Do not open with remarks such as \
\"Of course\" or \"Based on\", and do not describe your writing process.
";

pub(super) const CRITIQUE_PLAN: &str = "\
You review research proposals strictly.

User query: {query}

Related papers:
{papers}

Inspiration:
{inspiration}

Draft proposal:
{plan}

Identify the proposal's key weaknesses, such as overlap with existing literature, shallow novelty, \
weak alignment with the inspiration or gaps it fails to address. For each, give a concrete revision \
that would make the proposal more original, rigorous and relevant to the query.
";

pub(super) const REFINE_PLAN: &str = "\
You revise research proposals.

User query: {query}

Draft proposal:
{plan}

Review and revision suggestions:
{criticism}

Revise the proposal to address the review. Keep the core idea and method of the draft unchanged. \
Keep the sections Research Background, Limitations of Current Work, Proposed Research Plan and \
References unless the query asks for another structure, and renumber citations as [1]..[N] in order \
of first mention with no gaps.

Reply in Markdown and begin directly with the first heading. Output only the revised proposal, \
without remarks about what you changed.
";

pub(super) const PLAN_TITLE: &str = "\
You write titles for research proposals.

Best idea:
{best_idea}

Write one clear, specific title of at most 20 words for a proposal built on this idea. Reply with \
the title only.
";
