//! Go support code shared by every generated file of a package: the
//! router, route registration and the write/escape helpers the emitted
//! `Respond` methods call.

/// File name `upc build` writes the support code to
pub const RUNTIME_FILE_NAME: &str = "up_runtime.go";

const PACKAGE_PLACEHOLDER: &str = "__PACKAGE__";

const RUNTIME_TEMPLATE: &str = r#"// Code generated by upc. DO NOT EDIT.

package __PACKAGE__

import (
	"context"
	"fmt"
	"html"
	"html/template"
	"io"
	"net/http"
	"regexp"
	"strconv"
	"strings"
)

// UpResponder renders one page or partial.
type UpResponder interface {
	Respond(w http.ResponseWriter, req *http.Request) error
}

type upRouteRole int

const (
	upRolePage upRouteRole = iota
	upRolePartial
)

type upRoute struct {
	pattern   string
	regex     *regexp.Regexp
	slugs     []string
	responder UpResponder
	role      upRouteRole
}

var upRoutes []*upRoute

func upRegister(pattern string, responder UpResponder, role upRouteRole) {
	regex, slugs := upCompilePattern(pattern)
	upRoutes = append(upRoutes, &upRoute{
		pattern:   pattern,
		regex:     regex,
		slugs:     slugs,
		responder: responder,
		role:      role,
	})
}

var upSlugRegex = regexp.MustCompile(`:([A-Za-z_][A-Za-z0-9_]*)`)

func upCompilePattern(pattern string) (*regexp.Regexp, []string) {
	var b strings.Builder
	var slugs []string
	b.WriteString("^")
	last := 0
	for _, m := range upSlugRegex.FindAllStringSubmatchIndex(pattern, -1) {
		b.WriteString(regexp.QuoteMeta(pattern[last:m[0]]))
		b.WriteString("([^/]+)")
		slugs = append(slugs, pattern[m[2]:m[3]])
		last = m[1]
	}
	b.WriteString(regexp.QuoteMeta(pattern[last:]))
	b.WriteString("$")
	return regexp.MustCompile(b.String()), slugs
}

// upMatch picks the matching route with the fewest slugs.
func upMatch(path string) (*upRoute, map[string]string) {
	var best *upRoute
	var bestMatch []string
	for _, r := range upRoutes {
		m := r.regex.FindStringSubmatch(path)
		if m == nil {
			continue
		}
		if best == nil || len(r.slugs) < len(best.slugs) {
			best, bestMatch = r, m
		}
	}
	if best == nil {
		return nil, nil
	}
	params := make(map[string]string, len(best.slugs))
	for i, slug := range best.slugs {
		params[slug] = bestMatch[i+1]
	}
	return best, params
}

type upParamsKey struct{}

// UpParam returns the named slug captured from the request path.
func UpParam(req *http.Request, name string) string {
	params, _ := req.Context().Value(upParamsKey{}).(map[string]string)
	return params[name]
}

// UpRouter dispatches requests to the registered pages and partials.
type UpRouter struct{}

func (UpRouter) ServeHTTP(w http.ResponseWriter, req *http.Request) {
	route, params := upMatch(req.URL.Path)
	if route == nil {
		trimmed := strings.TrimSuffix(req.URL.Path, "/")
		if trimmed != req.URL.Path && trimmed != "" {
			if r, _ := upMatch(trimmed); r != nil {
				http.Redirect(w, req, trimmed, http.StatusMovedPermanently)
				return
			}
		}
		http.NotFound(w, req)
		return
	}
	ctx := context.WithValue(req.Context(), upParamsKey{}, params)
	if err := route.responder.Respond(w, req.WithContext(ctx)); err != nil {
		http.Error(w, err.Error(), http.StatusInternalServerError)
	}
}

func upWriteLiteral(w io.Writer, s string) {
	io.WriteString(w, s)
}

func upPrintEscaped(w io.Writer, val any) {
	switch v := val.(type) {
	case string:
		io.WriteString(w, html.EscapeString(v))
	case []byte:
		io.WriteString(w, html.EscapeString(string(v)))
	case int:
		io.WriteString(w, strconv.Itoa(v))
	case int64:
		io.WriteString(w, strconv.FormatInt(v, 10))
	case int8, int16, int32, uint, uint8, uint16, uint32, uint64:
		io.WriteString(w, fmt.Sprintf("%d", v))
	case template.HTML:
		io.WriteString(w, string(v))
	case fmt.Stringer:
		io.WriteString(w, html.EscapeString(v.String()))
	default:
		io.WriteString(w, html.EscapeString(fmt.Sprint(v)))
	}
}
"#;

/// Support code for the Go package `package`.
pub fn runtime_support(package: &str) -> String {
    RUNTIME_TEMPLATE.replacen(PACKAGE_PLACEHOLDER, package, 1)
}
