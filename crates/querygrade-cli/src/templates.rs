pub const CATALOG_FILE: &str = "exercises.yaml";

pub const SAMPLE_CATALOG: &str = r#"version: 1
exercises:
  - id: movies-1999
    title: Movies of 1999
    description: List the identifiers of all titles that started in 1999.
    difficulty: easy
    tables: [basics]
    starterSql: select tconst from basics
    solutionSql: select tconst from basics where startyear = 1999

  - id: titles-per-genre
    title: Titles per genre
    description: Count the titles of each genre, most common genre first.
    difficulty: medium
    tables: [basics]
    solutionSql: >-
      select genres, count(*) as n from basics
      group by genres order by n desc

  - id: above-average
    title: Better than average
    description: Titles rated above the average rating of all rated titles.
    difficulty: hard
    tables: [basics, ratings]
    solutionSql: >-
      select b.primarytitle, r.averagerating from basics b
      join ratings r on r.tconst = b.tconst
      where r.averagerating > (select avg(averagerating) from ratings)
      order by r.averagerating desc
"#;
